//! Spring-damper control math.
//!
//! Pure functions behind the controller systems: gravity, the levitation
//! (height) regulator, the movement acceleration solver and the erector
//! (attitude) regulator. Nothing here touches the ECS world, so every formula
//! can be checked in isolation.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::probe::GroundProbeResult;

/// Squared sine-of-half-angle below which a rotation is treated as identity.
const IDENTITY_EPSILON: f32 = 1.0e-12;

// ==================== Gravity ====================

/// Gravity force replacing the engine's native gravity.
///
/// `multiplier * mass * |g| * normalize(g)`. A zero engine gravity yields zero.
pub fn gravity_force(engine_gravity: Vec3, mass: f32, multiplier: f32) -> Vec3 {
    multiplier * mass * engine_gravity.length() * engine_gravity.normalize_or_zero()
}

// ==================== Levitation ====================

/// Restoring magnitude of the height spring, positive = push toward the ground.
///
/// `surface_distance` is the probe distance with the probe radius removed,
/// `vertical_velocity` is the body velocity along up.
pub fn levitation_magnitude(
    surface_distance: f32,
    vertical_velocity: f32,
    config: &MovementConfig,
) -> f32 {
    // Positive = too high
    let height_error = surface_distance - config.ride_height;
    // Positive = approaching the ground
    let closing_speed = -vertical_velocity;

    height_error * config.levitator_stiffness - closing_speed * config.levitator_damper
}

/// Full levitation force for this tick.
///
/// Zero when the probe found no ground. Otherwise the spring term along the
/// down axis minus the same-tick gravity force, so the spring alone governs
/// vertical settling while grounded.
pub fn levitation_force(
    probe: &GroundProbeResult,
    velocity: Vec3,
    up: Vec3,
    gravity_force: Vec3,
    config: &MovementConfig,
) -> Vec3 {
    let Some(surface_distance) = probe.surface_distance(config.ground_probe_radius) else {
        return Vec3::ZERO;
    };

    let vertical_velocity = velocity.dot(up);
    let magnitude = levitation_magnitude(surface_distance, vertical_velocity, config);

    -up * magnitude - gravity_force
}

// ==================== Movement ====================

/// Map a 2D input onto the horizontal world plane as `(x, 0, y)`.
///
/// No renormalization: a diagonal input keeps its magnitude.
#[inline]
pub fn input_to_world_plane(input: Vec2) -> Vec3 {
    Vec3::new(input.x, 0.0, input.y)
}

/// Remove the component of `vector` along the unit `normal`.
#[inline]
pub fn project_on_plane(vector: Vec3, normal: Vec3) -> Vec3 {
    vector - normal * vector.dot(normal)
}

/// Clamp `acceleration` to at most `max` in magnitude, preserving direction.
#[inline]
pub fn clamp_acceleration(acceleration: Vec3, max: f32) -> Vec3 {
    acceleration.clamp_length_max(max.max(0.0))
}

/// Everything the movement step computed for one tick.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementSolution {
    /// Horizontal velocity the input asks for.
    pub goal_velocity: Vec3,
    /// Current velocity with the vertical component removed.
    pub horizontal_velocity: Vec3,
    /// Acceleration needed to reach the goal in one tick, before clamping.
    pub raw_acceleration: Vec3,
    /// Clamped acceleration.
    pub acceleration: Vec3,
    /// `mass * acceleration`.
    pub force: Vec3,
    /// World point the force is applied at (raised by `lean_offset`).
    pub application_point: Vec3,
}

/// Solve the movement force for one tick.
///
/// `world_input` is the input already mapped with [`input_to_world_plane`].
pub fn solve_movement(
    world_input: Vec3,
    velocity: Vec3,
    position: Vec3,
    up: Vec3,
    mass: f32,
    dt: f32,
    config: &MovementConfig,
) -> MovementSolution {
    let goal_velocity = project_on_plane(world_input * config.top_speed(), up);
    let horizontal_velocity = project_on_plane(velocity, up);

    let raw_acceleration = if dt > 0.0 {
        (goal_velocity - horizontal_velocity) / dt
    } else {
        Vec3::ZERO
    };
    let acceleration = clamp_acceleration(raw_acceleration, config.max_acceleration);

    MovementSolution {
        goal_velocity,
        horizontal_velocity,
        raw_acceleration,
        acceleration,
        force: acceleration * mass,
        application_point: position + up * config.lean_offset,
    }
}

// ==================== Orientation ====================

/// Rotation whose local `+Z` points along `forward` and local `+Y` is as close
/// to `up` as possible.
///
/// Falls back to identity when `forward` is zero or parallel to `up`.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let z = forward.normalize_or_zero();
    let x = up.cross(z).normalize_or_zero();
    if z == Vec3::ZERO || x == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

/// Shortest-path rotation taking `from` onto `to`, i.e. `to * from⁻¹`.
///
/// `q` and `-q` encode the same orientation. When the operands lie in opposite
/// hemispheres (`dot < 0`) one is negated first, so the result always has a
/// non-negative scalar part and an angle of at most 180°.
pub fn shortest_rotation(to: Quat, from: Quat) -> Quat {
    if to.dot(from) < 0.0 {
        to * (-from).inverse()
    } else {
        to * from.inverse()
    }
}

/// Axis-angle of `rotation` packed as `axis * angle_in_radians`.
///
/// Uses `2 * atan2(|xyz|, w)` rather than `acos(w)` so small angles keep
/// their precision.
pub fn rotation_vector(rotation: Quat) -> Vec3 {
    let xyz = rotation.xyz();
    let sin_half_sq = xyz.length_squared();
    if sin_half_sq < IDENTITY_EPSILON {
        return Vec3::ZERO;
    }

    let sin_half = sin_half_sq.sqrt();
    let angle = 2.0 * sin_half.atan2(rotation.w);
    xyz * (angle / sin_half)
}

/// Erector torque toward the look rotation of `heading`.
///
/// `axis * angle * stiffness - angular_velocity * damper`.
pub fn orientation_torque(
    current: Quat,
    heading: Vec3,
    up: Vec3,
    angular_velocity: Vec3,
    config: &MovementConfig,
) -> Vec3 {
    let goal = look_rotation(heading, up);
    let error = shortest_rotation(goal, current);

    rotation_vector(error) * config.erector_stiffness - angular_velocity * config.erector_damper
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPS: f32 = 1.0e-4;

    fn sample_rotations() -> Vec<Quat> {
        let angles = [-3.0, -2.2, -1.1, -0.3, 0.0, 0.4, 1.3, 2.5, 3.1];
        let mut out = Vec::new();
        for &a in &angles {
            for &b in &angles {
                out.push(Quat::from_euler(EulerRot::YXZ, a, b * 0.5, a - b));
            }
        }
        out
    }

    fn same_rotation(a: Quat, b: Quat) -> bool {
        a.dot(b).abs() > 1.0 - EPS
    }

    #[test]
    fn gravity_force_scales_engine_gravity() {
        let g = Vec3::new(0.0, -9.81, 0.0);
        let force = gravity_force(g, 2.0, 1.5);
        assert!((force - Vec3::new(0.0, -29.43, 0.0)).length() < EPS);
    }

    #[test]
    fn gravity_force_zero_gravity_is_zero() {
        assert_eq!(gravity_force(Vec3::ZERO, 3.0, 2.0), Vec3::ZERO);
    }

    #[test]
    fn levitation_scenario_magnitude_is_ten() {
        let config = MovementConfig::default()
            .with_ride_height(0.8)
            .with_levitator(50.0, 10.0);
        let magnitude = levitation_magnitude(1.0, 0.0, &config);
        assert!((magnitude - 10.0).abs() < EPS);
    }

    #[test]
    fn levitation_scenario_force_points_down_before_cancellation() {
        let config = MovementConfig::default()
            .with_ride_height(0.8)
            .with_levitator(50.0, 10.0)
            .with_ground_probe(2.0, 0.25);
        // distance - radius = 1.0
        let probe = GroundProbeResult::hit(1.25);

        let force = levitation_force(&probe, Vec3::ZERO, Vec3::Y, Vec3::ZERO, &config);
        assert!((force - Vec3::new(0.0, -10.0, 0.0)).length() < EPS);
    }

    #[test]
    fn levitation_cancels_gravity_at_ride_height() {
        let config = MovementConfig::default().with_ground_probe(2.0, 0.25);
        let probe = GroundProbeResult::hit(config.ride_height + config.ground_probe_radius);
        let gravity = gravity_force(Vec3::new(0.0, -9.81, 0.0), 1.0, 1.0);

        let force = levitation_force(&probe, Vec3::ZERO, Vec3::Y, gravity, &config);
        // Exactly opposes gravity, net vertical force zero at rest
        assert!((force + gravity).length() < EPS);
    }

    #[test]
    fn levitation_damps_closing_speed() {
        let config = MovementConfig::default().with_levitator(50.0, 10.0);
        // At ride height, falling at 2 m/s -> pushes up (negative magnitude)
        let falling = levitation_magnitude(config.ride_height, -2.0, &config);
        assert!((falling + 20.0).abs() < EPS);
        // Rising at 2 m/s -> pulls down
        let rising = levitation_magnitude(config.ride_height, 2.0, &config);
        assert!((rising - 20.0).abs() < EPS);
    }

    #[test]
    fn levitation_is_exactly_zero_when_ungrounded() {
        let config = MovementConfig::default();
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        for velocity in [Vec3::ZERO, Vec3::new(1.0, -5.0, 2.0), Vec3::Y * 100.0] {
            let force =
                levitation_force(&GroundProbeResult::miss(), velocity, Vec3::Y, gravity, &config);
            assert_eq!(force, Vec3::ZERO);
        }
    }

    #[test]
    fn movement_scenario_clamps_to_max_acceleration() {
        let config = MovementConfig::default()
            .with_speed(5.0, 1.0)
            .with_max_acceleration(50.0);
        let input = input_to_world_plane(Vec2::new(1.0, 0.0));

        let solution = solve_movement(input, Vec3::ZERO, Vec3::ZERO, Vec3::Y, 1.0, 0.02, &config);

        assert!((solution.raw_acceleration - Vec3::new(250.0, 0.0, 0.0)).length() < 1.0e-2);
        assert!((solution.acceleration - Vec3::new(50.0, 0.0, 0.0)).length() < EPS);
    }

    #[test]
    fn clamp_preserves_direction_and_takes_min_magnitude() {
        let max = 50.0;
        let samples = [
            Vec3::new(250.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 4.0),
            Vec3::new(-30.0, 0.0, 40.0),
            Vec3::new(-300.0, 0.0, -400.0),
            Vec3::ZERO,
        ];
        for raw in samples {
            let clamped = clamp_acceleration(raw, max);
            assert!((clamped.length() - raw.length().min(max)).abs() < EPS);
            if raw != Vec3::ZERO {
                assert!(clamped.normalize().dot(raw.normalize()) > 1.0 - EPS);
            }
        }
    }

    #[test]
    fn zero_max_acceleration_yields_zero() {
        assert_eq!(clamp_acceleration(Vec3::new(10.0, 0.0, 0.0), 0.0), Vec3::ZERO);
    }

    #[test]
    fn movement_velocities_are_horizontal() {
        let config = MovementConfig::default();
        let velocities = [
            Vec3::new(1.0, 5.0, -2.0),
            Vec3::new(0.0, -30.0, 0.0),
            Vec3::new(-4.0, 0.5, 7.0),
        ];
        let inputs = [Vec2::new(1.0, 1.0), Vec2::new(-0.3, 0.8), Vec2::ZERO];

        for velocity in velocities {
            for input in inputs {
                let solution = solve_movement(
                    input_to_world_plane(input),
                    velocity,
                    Vec3::ZERO,
                    Vec3::Y,
                    1.0,
                    1.0 / 60.0,
                    &config,
                );
                assert_eq!(solution.goal_velocity.y, 0.0);
                assert_eq!(solution.horizontal_velocity.y, 0.0);
                assert_eq!(solution.acceleration.y, 0.0);
            }
        }
    }

    #[test]
    fn diagonal_input_is_not_renormalized() {
        let config = MovementConfig::default()
            .with_speed(5.0, 1.0)
            .with_max_acceleration(10_000.0);
        let input = input_to_world_plane(Vec2::new(1.0, 1.0));
        let solution = solve_movement(input, Vec3::ZERO, Vec3::ZERO, Vec3::Y, 1.0, 0.02, &config);

        assert!((solution.goal_velocity.length() - 5.0 * 2.0_f32.sqrt()).abs() < EPS);
    }

    #[test]
    fn movement_force_is_raised_by_lean_offset_and_scaled_by_mass() {
        let config = MovementConfig::default().with_lean_offset(0.3);
        let position = Vec3::new(2.0, 1.0, -1.0);
        let input = input_to_world_plane(Vec2::new(0.0, 1.0));

        let solution = solve_movement(input, Vec3::ZERO, position, Vec3::Y, 4.0, 0.02, &config);

        assert_eq!(solution.application_point, position + Vec3::Y * 0.3);
        assert!((solution.force - solution.acceleration * 4.0).length() < EPS);
    }

    #[test]
    fn movement_brakes_without_input() {
        let config = MovementConfig::default();
        let solution = solve_movement(
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::Y,
            1.0,
            0.02,
            &config,
        );
        assert!(solution.acceleration.x < 0.0);
    }

    #[test]
    fn look_rotation_default_heading_is_identity() {
        let rotation = look_rotation(Vec3::Z, Vec3::Y);
        assert!(same_rotation(rotation, Quat::IDENTITY));
    }

    #[test]
    fn look_rotation_faces_heading() {
        for heading in [Vec3::X, Vec3::NEG_X, Vec3::NEG_Z, Vec3::new(1.0, 0.0, 1.0)] {
            let rotation = look_rotation(heading, Vec3::Y);
            let facing = rotation * Vec3::Z;
            assert!((facing - heading.normalize()).length() < EPS);
            assert!((rotation * Vec3::Y - Vec3::Y).length() < EPS);
        }
    }

    #[test]
    fn look_rotation_degenerate_is_identity() {
        assert_eq!(look_rotation(Vec3::ZERO, Vec3::Y), Quat::IDENTITY);
        assert_eq!(look_rotation(Vec3::Y, Vec3::Y), Quat::IDENTITY);
    }

    #[test]
    fn shortest_rotation_maps_from_onto_to() {
        for &a in &sample_rotations() {
            for &b in &sample_rotations() {
                let delta = shortest_rotation(a, b);
                assert!(
                    same_rotation(delta * b, a),
                    "delta * b should reproduce a: a={a:?} b={b:?}"
                );
            }
        }
    }

    #[test]
    fn shortest_rotation_never_exceeds_half_turn() {
        for &a in &sample_rotations() {
            for &b in &sample_rotations() {
                let delta = shortest_rotation(a, b);
                assert!(delta.w >= -EPS);
                assert!(rotation_vector(delta).length() <= PI + EPS);
            }
        }
    }

    #[test]
    fn shortest_rotation_ignores_double_cover_sign() {
        for &a in &sample_rotations() {
            for &b in &sample_rotations() {
                if a.dot(b).abs() < EPS {
                    continue;
                }
                let plus = shortest_rotation(a, b);
                let minus = shortest_rotation(a, -b);
                assert!((plus - minus).length() < EPS, "a={a:?} b={b:?}");
            }
        }
    }

    #[test]
    fn shortest_rotation_takes_short_way_around() {
        // 350° about Y is the same orientation as -10°; the error must be 10°, not 350°.
        let goal = Quat::IDENTITY;
        let current = Quat::from_rotation_y(350.0_f32.to_radians());
        let error = rotation_vector(shortest_rotation(goal, current));
        assert!((error.length() - 10.0_f32.to_radians()).abs() < 1.0e-3);
        // Rotating further toward 360° means rotating about +Y
        assert!(error.y > 0.0);
    }

    #[test]
    fn rotation_vector_matches_axis_angle() {
        let rotation = Quat::from_axis_angle(Vec3::X, FRAC_PI_2);
        let vector = rotation_vector(rotation);
        assert!((vector - Vec3::X * FRAC_PI_2).length() < EPS);
        assert_eq!(rotation_vector(Quat::IDENTITY), Vec3::ZERO);
    }

    #[test]
    fn orientation_torque_turns_back_toward_heading() {
        let config = MovementConfig::default().with_erector(40.0, 0.0);
        // Yawed +0.5 rad about Y while the heading is +Z
        let current = Quat::from_rotation_y(0.5);
        let torque = orientation_torque(current, Vec3::Z, Vec3::Y, Vec3::ZERO, &config);

        assert!((torque - Vec3::new(0.0, -20.0, 0.0)).length() < 1.0e-3);
    }

    #[test]
    fn orientation_torque_rights_a_tipped_body() {
        let config = MovementConfig::default().with_erector(10.0, 0.0);
        let current = Quat::from_rotation_x(0.3);
        let torque = orientation_torque(current, Vec3::Z, Vec3::Y, Vec3::ZERO, &config);
        assert!((torque - Vec3::new(-3.0, 0.0, 0.0)).length() < 1.0e-3);
    }

    #[test]
    fn orientation_torque_damps_angular_velocity() {
        let config = MovementConfig::default().with_erector(40.0, 6.0);
        let torque = orientation_torque(
            Quat::IDENTITY,
            Vec3::Z,
            Vec3::Y,
            Vec3::new(0.0, 2.0, 0.0),
            &config,
        );
        assert!((torque - Vec3::new(0.0, -12.0, 0.0)).length() < EPS);
    }
}
