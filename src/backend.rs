//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the doofus controller. The controller never integrates
//! bodies or resolves collisions itself; it reads body state and pushes
//! forces through this trait.
//!
//! Queries that need engine-specific system parameters (the ground probe and
//! the engine gravity readout) are performed by systems the backend plugin
//! adds to [`DoofusControllerSet::Sensors`](crate::DoofusControllerSet::Sensors).
//! Those systems write their results into
//! [`DoofusController`](crate::controller::DoofusController).

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// All accessors are static and take the ECS world, so backends are plain
/// marker types. Getters fall back to neutral values when the entity lacks
/// the relevant component; use [`has_body`](Self::has_body) to find out
/// whether there is anything to drive at all.
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`.
pub trait DoofusPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Whether the entity has a rigid body this backend can drive.
    fn has_body(world: &World, entity: Entity) -> bool;

    /// Get the current world position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Teleport an entity. Only used on reset.
    fn set_position(world: &mut World, entity: Entity, position: Vec3);

    /// Get the current world rotation of an entity.
    fn get_rotation(world: &World, entity: Entity) -> Quat;

    /// Set the world rotation of an entity. Only used on reset.
    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat);

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the current angular velocity of an entity (world frame, rad/s).
    fn get_angular_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the angular velocity of an entity.
    fn set_angular_velocity(world: &mut World, entity: Entity, angular_velocity: Vec3);

    /// Apply a continuous force through the center of mass.
    ///
    /// Force is applied over the physics timestep.
    fn apply_force(world: &mut World, entity: Entity, force: Vec3);

    /// Apply a continuous force at a world-space point.
    ///
    /// Off-center points produce the corresponding torque about the center of mass.
    fn apply_force_at_point(world: &mut World, entity: Entity, force: Vec3, point: Vec3);

    /// Apply a continuous torque (world frame).
    fn apply_torque(world: &mut World, entity: Entity, torque: Vec3);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    /// Get the mass of an entity.
    fn get_mass(_world: &World, _entity: Entity) -> f32 {
        // Default implementation returns 1.0 (no scaling)
        1.0
    }
}
