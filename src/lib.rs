//! # `doofus_controller`
//!
//! A 3D hovering rigidbody locomotion controller with physics backend abstraction.
//!
//! A doofus is a dynamic rigid body that never touches the ground. Each fixed
//! tick the controller:
//! - Probes the ground along gravity with a sphere cast
//! - Replaces the engine's gravity with its own, scaled by `gravity_multiplier`
//! - Holds the body at ride height with a spring-damper (the levitator)
//! - Drives the horizontal velocity toward the input with a clamped acceleration
//!   applied slightly above the center of mass, so the body leans into motion
//! - Turns the body upright and toward its heading with a torque spring-damper
//!   (the erector)
//! - Kills the doofus once it falls below a threshold height
//!
//! ## Architecture
//!
//! The controller never integrates bodies itself. It reads body state and
//! pushes forces through [`DoofusPhysicsBackend`](backend::DoofusPhysicsBackend)
//! (Rapier3D included). Simulation is gated by a lifecycle:
//! `Uninitialized -> Inactive -> Active -> Dead`, driven by the
//! [`GameStarted`](lifecycle::GameStarted) and [`ResetDoofus`](lifecycle::ResetDoofus)
//! messages. [`DoofusDied`](lifecycle::DoofusDied) is sent once per death.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use doofus_controller::prelude::*;
//!
//! // Controller components for a doofus, add a physics body next to them
//! let bundle = DoofusBundle::new(MovementConfig::snappy());
//! assert_eq!(bundle.lifecycle.state(), LifecycleState::Uninitialized);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod config;
pub mod controller;
pub mod forces;
pub mod intent;
pub mod lifecycle;
pub mod probe;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::DoofusPhysicsBackend;
    pub use crate::config::{ConfigError, MovementConfig};
    pub use crate::controller::{DoofusBundle, DoofusController, HeadingMemory};
    pub use crate::intent::MoveInput;
    pub use crate::lifecycle::{
        DoofusDied, DoofusLifecycle, GameStarted, LifecycleError, LifecycleState, ResetDoofus,
        SpawnPose,
    };
    pub use crate::probe::GroundProbeResult;
    pub use crate::state::{Airborne, Grounded};
    pub use crate::{DoofusControllerPlugin, DoofusControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dDoofusBundle};
}

/// System sets for one controller tick, run in this order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoofusControllerSet {
    /// Backend takes last tick's forces back out of the engine.
    Preparation,
    /// Initialization, game start, resets and the idle gate.
    Lifecycle,
    /// Ground probe and engine gravity readout (backend systems).
    Sensors,
    /// Gravity, levitation, movement and orientation.
    Forces,
    /// Fall check and death messages.
    Death,
    /// Backend writes the accumulated forces to the engine.
    FinalApplication,
}

/// Main plugin for the doofus controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (body state, force application, ground probing).
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use doofus_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(DoofusControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct DoofusControllerPlugin<B: backend::DoofusPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::DoofusPhysicsBackend> Default for DoofusControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::DoofusPhysicsBackend> Plugin for DoofusControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::DoofusController>();
        app.register_type::<config::MovementConfig>();
        app.register_type::<intent::MoveInput>();
        app.register_type::<lifecycle::DoofusLifecycle>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();

        // Messages
        app.add_event::<lifecycle::GameStarted>();
        app.add_event::<lifecycle::ResetDoofus>();
        app.add_event::<lifecycle::DoofusDied>();

        app.configure_sets(
            FixedUpdate,
            (
                DoofusControllerSet::Preparation,
                DoofusControllerSet::Lifecycle,
                DoofusControllerSet::Sensors,
                DoofusControllerSet::Forces,
                DoofusControllerSet::Death,
                DoofusControllerSet::FinalApplication,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::initialize_doofus_controllers::<B>,
                systems::handle_game_started,
                systems::handle_reset_requests,
                systems::apply_resets::<B>,
                systems::hold_idle_doofuses::<B>,
            )
                .chain()
                .in_set(DoofusControllerSet::Lifecycle),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::apply_gravity_force::<B>,
                systems::apply_levitation_force::<B>,
                systems::apply_movement_force::<B>,
                systems::apply_orientation_torque::<B>,
            )
                .chain()
                .in_set(DoofusControllerSet::Forces),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::check_fall_death::<B>,
                systems::emit_death_messages,
                systems::sync_state_markers,
            )
                .chain()
                .in_set(DoofusControllerSet::Death),
        );
    }
}
