//! Movement configuration component.
//!
//! This module defines the tuning parameters for a doofus: speed, acceleration
//! limits, ride height, and the gains of the two spring-damper regulators
//! (levitator for height, erector for attitude).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by [`MovementConfig::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A gain, distance or limit that must be non-negative was negative.
    #[error("`{field}` must be non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    /// `gravity_multiplier` must be strictly positive.
    #[error("`gravity_multiplier` must be strictly positive, got {0}")]
    NonPositiveGravityMultiplier(f32),

    /// A field held NaN or infinity.
    #[error("`{field}` must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
}

/// Configuration parameters for the doofus controller.
///
/// Loaded once before the controller is initialized and never mutated by the
/// controller itself. Derives serde traits so the orchestration layer can load
/// it from whatever format it uses.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[serde(default)]
pub struct MovementConfig {
    // === Lifecycle ===
    /// World-space height below which the doofus is considered dead.
    pub fall_death_threshold: f32,

    // === Movement Settings ===
    /// Base horizontal speed (units/second) at full input deflection.
    pub speed_base: f32,

    /// Multiplier on `speed_base`, for power-ups and difficulty scaling.
    pub speed_multiplier: f32,

    /// Maximum magnitude of the acceleration the movement force may request (units/second^2).
    pub max_acceleration: f32,

    /// Height above the body origin at which the movement force is applied.
    ///
    /// Applying the force above the center of mass makes the body lean into
    /// acceleration.
    pub lean_offset: f32,

    // === Gravity ===
    /// Multiplier on the engine's gravity vector. Must be strictly positive.
    pub gravity_multiplier: f32,

    // === Levitator (height spring) ===
    /// Target distance between the probe contact and the body.
    pub ride_height: f32,

    /// Spring strength of the height regulator.
    pub levitator_stiffness: f32,

    /// Damping coefficient of the height regulator.
    pub levitator_damper: f32,

    // === Erector (attitude spring) ===
    /// Spring strength of the orientation regulator.
    pub erector_stiffness: f32,

    /// Damping coefficient of the orientation regulator.
    pub erector_damper: f32,

    // === Ground Probe ===
    /// Maximum sweep distance of the ground probe.
    pub ground_check_range: f32,

    /// Radius of the swept probe sphere. Zero degrades to a ray cast.
    pub ground_probe_radius: f32,

    /// Collision group filter bits the probe may hit.
    pub ground_layer_filter: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            fall_death_threshold: -10.0,

            speed_base: 5.0,
            speed_multiplier: 1.0,
            max_acceleration: 50.0,
            lean_offset: 0.3,

            gravity_multiplier: 1.0,

            // Levitator settings (tuned for mass=1.0, 50 Hz)
            ride_height: 0.8,
            levitator_stiffness: 50.0,
            levitator_damper: 10.0,

            // Erector settings
            erector_stiffness: 40.0,
            erector_damper: 6.0,

            ground_check_range: 2.0,
            ground_probe_radius: 0.25,
            ground_layer_filter: u32::MAX,
        }
    }
}

impl MovementConfig {
    /// Create a config with heavier gravity and stiffer springs for a snappy feel.
    pub fn snappy() -> Self {
        Self {
            max_acceleration: 80.0,
            gravity_multiplier: 2.0,
            levitator_stiffness: 120.0,
            levitator_damper: 20.0,
            erector_stiffness: 80.0,
            erector_damper: 10.0,
            ..default()
        }
    }

    /// Create a config with light gravity and soft springs for a floaty feel.
    pub fn floaty() -> Self {
        Self {
            max_acceleration: 25.0,
            gravity_multiplier: 0.5,
            levitator_stiffness: 25.0,
            levitator_damper: 6.0,
            lean_offset: 0.5,
            ..default()
        }
    }

    /// Effective top speed (`speed_base * speed_multiplier`).
    #[inline]
    pub fn top_speed(&self) -> f32 {
        self.speed_base * self.speed_multiplier
    }

    /// Check the invariants the controller relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("fall_death_threshold", self.fall_death_threshold),
            ("speed_base", self.speed_base),
            ("speed_multiplier", self.speed_multiplier),
            ("max_acceleration", self.max_acceleration),
            ("lean_offset", self.lean_offset),
            ("gravity_multiplier", self.gravity_multiplier),
            ("ride_height", self.ride_height),
            ("levitator_stiffness", self.levitator_stiffness),
            ("levitator_damper", self.levitator_damper),
            ("erector_stiffness", self.erector_stiffness),
            ("erector_damper", self.erector_damper),
            ("ground_check_range", self.ground_check_range),
            ("ground_probe_radius", self.ground_probe_radius),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
        }

        // Only these must be non-negative; speeds and the death threshold may be signed.
        let non_negative = [
            ("max_acceleration", self.max_acceleration),
            ("lean_offset", self.lean_offset),
            ("ride_height", self.ride_height),
            ("levitator_stiffness", self.levitator_stiffness),
            ("levitator_damper", self.levitator_damper),
            ("erector_stiffness", self.erector_stiffness),
            ("erector_damper", self.erector_damper),
            ("ground_check_range", self.ground_check_range),
            ("ground_probe_radius", self.ground_probe_radius),
        ];
        for (field, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if self.gravity_multiplier <= 0.0 {
            return Err(ConfigError::NonPositiveGravityMultiplier(
                self.gravity_multiplier,
            ));
        }

        Ok(())
    }

    /// Builder: set speed parameters.
    pub fn with_speed(mut self, base: f32, multiplier: f32) -> Self {
        self.speed_base = base;
        self.speed_multiplier = multiplier;
        self
    }

    /// Builder: set max acceleration.
    pub fn with_max_acceleration(mut self, max_acceleration: f32) -> Self {
        self.max_acceleration = max_acceleration;
        self
    }

    /// Builder: set lean offset.
    pub fn with_lean_offset(mut self, offset: f32) -> Self {
        self.lean_offset = offset;
        self
    }

    /// Builder: set gravity multiplier.
    pub fn with_gravity_multiplier(mut self, multiplier: f32) -> Self {
        self.gravity_multiplier = multiplier;
        self
    }

    /// Builder: set ride height.
    pub fn with_ride_height(mut self, height: f32) -> Self {
        self.ride_height = height;
        self
    }

    /// Builder: set levitator spring parameters.
    pub fn with_levitator(mut self, stiffness: f32, damper: f32) -> Self {
        self.levitator_stiffness = stiffness;
        self.levitator_damper = damper;
        self
    }

    /// Builder: set erector spring parameters.
    pub fn with_erector(mut self, stiffness: f32, damper: f32) -> Self {
        self.erector_stiffness = stiffness;
        self.erector_damper = damper;
        self
    }

    /// Builder: set ground probe range and radius.
    pub fn with_ground_probe(mut self, range: f32, radius: f32) -> Self {
        self.ground_check_range = range;
        self.ground_probe_radius = radius;
        self
    }

    /// Builder: set ground layer filter bits.
    pub fn with_ground_layer_filter(mut self, filter: u32) -> Self {
        self.ground_layer_filter = filter;
        self
    }

    /// Builder: set fall death threshold.
    pub fn with_fall_death_threshold(mut self, threshold: f32) -> Self {
        self.fall_death_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(MovementConfig::default().validate(), Ok(()));
        assert_eq!(MovementConfig::snappy().validate(), Ok(()));
        assert_eq!(MovementConfig::floaty().validate(), Ok(()));
    }

    #[test]
    fn negative_gain_is_rejected() {
        let config = MovementConfig::default().with_levitator(-1.0, 10.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Negative {
                field: "levitator_stiffness",
                value: -1.0
            })
        );

        let config = MovementConfig::default().with_erector(40.0, -0.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative {
                field: "erector_damper",
                ..
            })
        ));
    }

    #[test]
    fn zero_gravity_multiplier_is_rejected() {
        let config = MovementConfig::default().with_gravity_multiplier(0.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveGravityMultiplier(0.0))
        );
    }

    #[test]
    fn nan_is_rejected() {
        let config = MovementConfig::default().with_ride_height(f32::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotFinite {
                field: "ride_height",
                ..
            })
        ));
    }

    #[test]
    fn negative_speed_and_threshold_are_allowed() {
        let config = MovementConfig::default()
            .with_speed(-5.0, 1.0)
            .with_fall_death_threshold(-100.0);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn top_speed_is_base_times_multiplier() {
        let config = MovementConfig::default().with_speed(5.0, 1.5);
        assert_eq!(config.top_speed(), 7.5);
    }

    #[test]
    fn error_messages_name_the_field() {
        let err = MovementConfig::default()
            .with_ground_probe(-2.0, 0.25)
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "`ground_check_range` must be non-negative, got -2"
        );
    }
}
