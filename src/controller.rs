//! Per-doofus controller state.
//!
//! [`DoofusController`] is the result hub the systems read and write each
//! tick: the ground probe result, the gravity force computed this tick, the
//! heading memory and the force/torque accumulators the backend flushes into
//! the physics engine.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::forces::MovementSolution;
use crate::intent::MoveInput;
use crate::lifecycle::DoofusLifecycle;
use crate::probe::GroundProbeResult;

/// Default engine gravity when no backend has reported one.
pub const DEFAULT_ENGINE_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Remembers the last direction the doofus was told to move in.
///
/// The orientation regulator keeps facing this heading while the body drifts
/// to a stop with zero input.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct HeadingMemory {
    direction: Vec3,
}

impl Default for HeadingMemory {
    fn default() -> Self {
        Self { direction: Vec3::Z }
    }
}

impl HeadingMemory {
    /// The last nonzero input direction (unit length).
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Record `world_input` as the heading if it is nonzero.
    ///
    /// Returns whether the heading changed.
    pub fn observe(&mut self, world_input: Vec3) -> bool {
        if world_input.length_squared() > 0.0 {
            self.direction = world_input.normalize_or(self.direction);
            true
        } else {
            false
        }
    }
}

/// Values computed during the last simulated tick, kept for inspection.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct TickDiagnostics {
    /// Levitation force applied (zero when ungrounded).
    pub levitation_force: Vec3,
    /// Movement solution (goal/horizontal velocity, acceleration, force).
    pub movement: MovementSolution,
    /// Erector torque applied.
    pub orientation_torque: Vec3,
}

/// Core doofus controller component.
///
/// Contains RESULT states produced by the sensor and force systems, not
/// configuration. Spawn it alongside a [`MovementConfig`](crate::config::MovementConfig),
/// a [`MoveInput`](crate::intent::MoveInput) and a
/// [`DoofusLifecycle`](crate::lifecycle::DoofusLifecycle).
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct DoofusController {
    // === Sensors ===
    /// Ground probe result for this tick.
    pub ground: GroundProbeResult,

    /// Gravity vector reported by the physics engine.
    pub engine_gravity: Vec3,

    // === In-tick values ===
    /// Gravity force computed this tick, reused for levitation cancellation.
    pub gravity_force: Vec3,

    /// Last nonzero input heading.
    pub heading: HeadingMemory,

    /// Diagnostics from the last simulated tick.
    pub diagnostics: TickDiagnostics,

    // === Lifecycle plumbing ===
    /// Position of a death transition that has not been announced yet.
    pub(crate) pending_death: Option<Vec3>,
    /// Set when a reset was requested and has not been applied.
    pub(crate) reset_pending: bool,
    /// Whether a missing rigid body has already been reported.
    pub(crate) missing_body_reported: bool,
    /// Whether a failed initialization has already been reported.
    pub(crate) init_failure_reported: bool,

    // === Force accumulation ===
    /// Force accumulated this tick.
    pub(crate) accumulated_force: Vec3,
    /// Torque accumulated this tick.
    pub(crate) accumulated_torque: Vec3,
    /// Force written to the engine last tick, subtracted before the next one.
    pub(crate) applied_force: Vec3,
    /// Torque written to the engine last tick, subtracted before the next one.
    pub(crate) applied_torque: Vec3,
}

impl Default for DoofusController {
    fn default() -> Self {
        Self {
            ground: GroundProbeResult::miss(),
            engine_gravity: DEFAULT_ENGINE_GRAVITY,
            gravity_force: Vec3::ZERO,
            heading: HeadingMemory::default(),
            diagnostics: TickDiagnostics::default(),
            pending_death: None,
            reset_pending: false,
            missing_body_reported: false,
            init_failure_reported: false,
            accumulated_force: Vec3::ZERO,
            accumulated_torque: Vec3::ZERO,
            applied_force: Vec3::ZERO,
            applied_torque: Vec3::ZERO,
        }
    }
}

impl DoofusController {
    /// Create a new controller with default engine gravity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new controller with a custom engine gravity.
    pub fn with_engine_gravity(gravity: Vec3) -> Self {
        Self {
            engine_gravity: gravity,
            ..default()
        }
    }

    /// World up axis, opposite to engine gravity (`+Y` when gravity is zero).
    pub fn up(&self) -> Vec3 {
        (-self.engine_gravity).normalize_or(Vec3::Y)
    }

    /// Whether the ground probe found a surface this tick.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded
    }

    /// Force accumulated so far this tick.
    #[inline]
    pub fn accumulated_force(&self) -> Vec3 {
        self.accumulated_force
    }

    /// Torque accumulated so far this tick.
    #[inline]
    pub fn accumulated_torque(&self) -> Vec3 {
        self.accumulated_torque
    }

    /// Add to the force accumulator.
    pub fn add_force(&mut self, force: Vec3) {
        self.accumulated_force += force;
    }

    /// Add to the torque accumulator.
    pub fn add_torque(&mut self, torque: Vec3) {
        self.accumulated_torque += torque;
    }

    /// Start a new tick.
    ///
    /// Returns the force and torque written to the engine last tick so the
    /// backend can subtract them, and clears the accumulators.
    pub fn prepare_new_frame(&mut self) -> (Vec3, Vec3) {
        let previous = (self.applied_force, self.applied_torque);
        self.applied_force = Vec3::ZERO;
        self.applied_torque = Vec3::ZERO;
        self.accumulated_force = Vec3::ZERO;
        self.accumulated_torque = Vec3::ZERO;
        previous
    }

    /// Finish the tick.
    ///
    /// Returns the accumulated force and torque and remembers them as applied.
    pub fn finalize_frame(&mut self) -> (Vec3, Vec3) {
        self.applied_force = self.accumulated_force;
        self.applied_torque = self.accumulated_torque;
        (self.accumulated_force, self.accumulated_torque)
    }

    /// Drop everything computed for the current tick.
    ///
    /// Used when the doofus is not simulating so no stale force reaches the engine.
    pub(crate) fn clear_tick(&mut self) {
        self.accumulated_force = Vec3::ZERO;
        self.accumulated_torque = Vec3::ZERO;
        self.gravity_force = Vec3::ZERO;
        self.diagnostics = TickDiagnostics::default();
    }
}

/// Everything a doofus needs besides its physics body.
///
/// The lifecycle starts `Uninitialized` and is bound on the next tick.
#[derive(Bundle, Default)]
pub struct DoofusBundle {
    /// Controller state.
    pub controller: DoofusController,
    /// Tuning parameters.
    pub config: MovementConfig,
    /// Input source.
    pub input: MoveInput,
    /// Lifecycle guard.
    pub lifecycle: DoofusLifecycle,
}

impl DoofusBundle {
    /// Create a bundle with the given tuning.
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_defaults_to_forward() {
        assert_eq!(HeadingMemory::default().direction(), Vec3::Z);
    }

    #[test]
    fn heading_updates_only_on_nonzero_input() {
        let mut heading = HeadingMemory::default();

        assert!(heading.observe(Vec3::new(3.0, 0.0, 4.0)));
        assert!((heading.direction() - Vec3::new(0.6, 0.0, 0.8)).length() < 1.0e-6);

        assert!(!heading.observe(Vec3::ZERO));
        assert!((heading.direction() - Vec3::new(0.6, 0.0, 0.8)).length() < 1.0e-6);
    }

    #[test]
    fn controller_new() {
        let controller = DoofusController::new();
        assert!(!controller.is_grounded());
        assert_eq!(controller.engine_gravity, DEFAULT_ENGINE_GRAVITY);
        assert_eq!(controller.up(), Vec3::Y);
    }

    #[test]
    fn up_opposes_gravity() {
        let controller = DoofusController::with_engine_gravity(Vec3::new(0.0, 0.0, -3.0));
        assert_eq!(controller.up(), Vec3::Z);

        let weightless = DoofusController::with_engine_gravity(Vec3::ZERO);
        assert_eq!(weightless.up(), Vec3::Y);
    }

    #[test]
    fn frame_accumulation_round_trip() {
        let mut controller = DoofusController::new();
        controller.add_force(Vec3::new(1.0, 2.0, 3.0));
        controller.add_force(Vec3::new(1.0, 0.0, 0.0));
        controller.add_torque(Vec3::Y);

        let (force, torque) = controller.finalize_frame();
        assert_eq!(force, Vec3::new(2.0, 2.0, 3.0));
        assert_eq!(torque, Vec3::Y);

        let (previous_force, previous_torque) = controller.prepare_new_frame();
        assert_eq!(previous_force, Vec3::new(2.0, 2.0, 3.0));
        assert_eq!(previous_torque, Vec3::Y);
        assert_eq!(controller.accumulated_force(), Vec3::ZERO);
        assert_eq!(controller.accumulated_torque(), Vec3::ZERO);

        // Nothing applied since the last prepare
        assert_eq!(controller.prepare_new_frame(), (Vec3::ZERO, Vec3::ZERO));
    }

    #[test]
    fn clear_tick_drops_pending_forces() {
        let mut controller = DoofusController::new();
        controller.add_force(Vec3::X);
        controller.gravity_force = Vec3::NEG_Y;
        controller.clear_tick();
        assert_eq!(controller.accumulated_force(), Vec3::ZERO);
        assert_eq!(controller.gravity_force, Vec3::ZERO);
    }

    #[test]
    fn bundle_starts_uninitialized() {
        let bundle = DoofusBundle::new(MovementConfig::snappy());
        assert_eq!(bundle.config, MovementConfig::snappy());
        assert_eq!(
            bundle.lifecycle.state(),
            crate::lifecycle::LifecycleState::Uninitialized
        );
        assert!(!bundle.input.is_active());
    }
}
