//! Movement input component.
//!
//! The input source boundary of the controller. Whatever acquires input
//! (keyboard, gamepad, AI, network) writes a 2D vector here; the controller
//! polls it once per tick.

use bevy::prelude::*;

use crate::forces::input_to_world_plane;

/// Normalized 2D movement input.
///
/// Each axis is clamped to `[-1, 1]`. The vector itself is not renormalized,
/// so a full diagonal has magnitude `sqrt(2)`.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use doofus_controller::prelude::*;
///
/// let mut input = MoveInput::new();
/// input.set(Vec2::new(1.0, 0.0));
/// assert!(input.is_active());
/// assert_eq!(input.to_world_plane(), Vec3::X);
///
/// input.clear();
/// assert!(!input.is_active());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[reflect(Component)]
pub struct MoveInput {
    value: Vec2,
}

impl MoveInput {
    /// Create a new zero input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input with the given value.
    pub fn from_value(value: Vec2) -> Self {
        let mut input = Self::default();
        input.set(value);
        input
    }

    /// Store a new input value, clamping each axis to `[-1, 1]`.
    ///
    /// Non-finite components are treated as zero.
    pub fn set(&mut self, value: Vec2) {
        let sanitize = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        self.value = Vec2::new(sanitize(value.x), sanitize(value.y));
    }

    /// The current input value.
    #[inline]
    pub fn value(&self) -> Vec2 {
        self.value
    }

    /// Reset to zero.
    pub fn clear(&mut self) {
        self.value = Vec2::ZERO;
    }

    /// Whether there is any input this tick.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.value.length_squared() > 0.0
    }

    /// The input mapped onto the horizontal world plane as `(x, 0, y)`.
    #[inline]
    pub fn to_world_plane(&self) -> Vec3 {
        input_to_world_plane(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero() {
        let input = MoveInput::default();
        assert_eq!(input.value(), Vec2::ZERO);
        assert!(!input.is_active());
    }

    #[test]
    fn set_clamps_each_axis() {
        let input = MoveInput::from_value(Vec2::new(3.0, -2.0));
        assert_eq!(input.value(), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn diagonal_is_not_renormalized() {
        let input = MoveInput::from_value(Vec2::new(1.0, 1.0));
        assert!((input.value().length() - 2.0_f32.sqrt()).abs() < 1.0e-6);
    }

    #[test]
    fn non_finite_becomes_zero() {
        let input = MoveInput::from_value(Vec2::new(f32::NAN, 0.5));
        assert_eq!(input.value(), Vec2::new(0.0, 0.5));
    }

    #[test]
    fn world_plane_mapping() {
        let input = MoveInput::from_value(Vec2::new(0.5, -0.25));
        assert_eq!(input.to_world_plane(), Vec3::new(0.5, 0.0, -0.25));
    }

    #[test]
    fn clear_resets() {
        let mut input = MoveInput::from_value(Vec2::ONE);
        input.clear();
        assert!(!input.is_active());
    }
}
