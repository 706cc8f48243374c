//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature (on by default).

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::DoofusPhysicsBackend;
use crate::config::MovementConfig;
use crate::controller::DoofusController;
use crate::probe::GroundProbeRequest;

/// Rapier3D physics backend for the doofus controller.
///
/// Pose and velocity go through `Transform` and [`Velocity`]. Forces are
/// accumulated in [`DoofusController`] and flushed into [`ExternalForce`] once
/// per tick, so forces other code writes to `ExternalForce` are preserved.
/// The ground probe and gravity readout are done by dedicated Rapier systems
/// that receive `RapierContext` as a system parameter.
pub struct Rapier3dBackend;

impl DoofusPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn has_body(world: &World, entity: Entity) -> bool {
        world.get::<RigidBody>(entity).is_some()
            && world.get::<Velocity>(entity).is_some()
            && world.get::<ExternalForce>(entity).is_some()
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation())
            })
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .or_else(|| {
                world.get::<GlobalTransform>(entity).map(|t| {
                    let (_, rotation, _) = t.to_scale_rotation_translation();
                    rotation
                })
            })
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_angular_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.angvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_angular_velocity(world: &mut World, entity: Entity, angular_velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.angvel = angular_velocity;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec3) {
        // Accumulate into DoofusController instead of directly modifying ExternalForce.
        // Forces reach ExternalForce at the end of the tick in apply_controller_forces.
        if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
            controller.add_force(force);
        }
    }

    fn apply_force_at_point(world: &mut World, entity: Entity, force: Vec3, point: Vec3) {
        let center_of_mass = world_center_of_mass(world, entity);
        if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
            controller.add_force(force);
            controller.add_torque((point - center_of_mass).cross(force));
        }
    }

    fn apply_torque(world: &mut World, entity: Entity, torque: Vec3) {
        if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
            controller.add_torque(torque);
        }
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        // Rapier fills mass properties after the first step; until then treat
        // the body as unit mass.
        world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.mass)
            .filter(|mass| *mass > 0.0 && mass.is_finite())
            .unwrap_or(1.0)
    }
}

/// World-space center of mass of an entity.
///
/// Falls back to the body origin when mass properties are not available yet.
fn world_center_of_mass(world: &World, entity: Entity) -> Vec3 {
    let position = Rapier3dBackend::get_position(world, entity);
    let rotation = Rapier3dBackend::get_rotation(world, entity);
    let local = world
        .get::<ReadMassProperties>(entity)
        .map(|props| props.local_center_of_mass)
        .unwrap_or(Vec3::ZERO);
    position + rotation * local
}

/// Plugin that sets up Rapier3D-specific systems for the doofus controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::DoofusControllerSet;

        // Preparation - take last tick's forces back out of ExternalForce
        app.add_systems(
            FixedUpdate,
            clear_controller_forces.in_set(DoofusControllerSet::Preparation),
        );

        // Sensors - gravity first, the probe direction depends on it
        app.add_systems(
            FixedUpdate,
            (rapier_sync_gravity, rapier_ground_probe)
                .chain()
                .in_set(DoofusControllerSet::Sensors),
        );

        // Final application - flush accumulated forces into ExternalForce
        app.add_systems(
            FixedUpdate,
            apply_controller_forces.in_set(DoofusControllerSet::FinalApplication),
        );
    }
}

/// Copy the engine gravity from the Rapier configuration into every controller.
fn rapier_sync_gravity(
    q_config: Query<&RapierConfiguration>,
    mut q_controllers: Query<&mut DoofusController>,
) {
    let Ok(config) = q_config.single() else {
        return;
    };

    for mut controller in &mut q_controllers {
        if controller.engine_gravity != config.gravity {
            controller.engine_gravity = config.gravity;
        }
    }
}

/// Perform the ground probe for one request.
///
/// A zero radius casts a ray, otherwise a sphere is swept along the probe
/// direction. Returns the distance from the origin to the first contact.
fn rapier_probe(
    context: &RapierContext,
    request: &GroundProbeRequest,
    exclude_entity: Entity,
    memberships: Group,
) -> Option<f32> {
    // Exclude the doofus itself and sensors, only hit the configured layers
    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            memberships,
            Group::from_bits_truncate(request.filter),
        ));

    if request.is_ray() {
        return context
            .cast_ray(
                request.origin,
                request.direction,
                request.max_distance,
                true,
                filter,
            )
            .map(|(_, toi)| toi);
    }

    let shape = Collider::ball(request.radius);
    context
        .cast_shape(
            request.origin,
            Quat::IDENTITY,
            request.direction,
            &shape,
            ShapeCastOptions {
                max_time_of_impact: request.max_distance,
                stop_at_penetration: false,
                ..default()
            },
            filter,
        )
        .map(|(_, hit)| request.contact_distance(hit.time_of_impact))
}

/// Rapier-specific ground probe system.
///
/// The probe points along engine gravity, NOT along the body's rotation, so
/// a tilted doofus still measures its height above the ground below it.
fn rapier_ground_probe(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &MovementConfig,
        &mut DoofusController,
        Option<&CollisionGroups>,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, mut controller, collision_groups) in &mut q_controllers {
        let request = GroundProbeRequest::new(transform.translation(), controller.up(), config);
        let memberships = collision_groups
            .map(|cg| cg.memberships)
            .unwrap_or(Group::ALL);

        let hit = rapier_probe(&context, &request, entity, memberships);
        controller.ground = request.resolve(hit);
    }
}

/// Clear controller forces at the start of each tick.
///
/// This system runs BEFORE all controller force systems. It:
/// 1. Subtracts the forces we applied last tick from ExternalForce
/// 2. Clears the accumulators for the new tick
///
/// External user forces are preserved while ours are isolated between ticks.
pub fn clear_controller_forces(mut q: Query<(&mut ExternalForce, &mut DoofusController)>) {
    for (mut ext_force, mut controller) in &mut q {
        let (force_to_subtract, torque_to_subtract) = controller.prepare_new_frame();

        ext_force.force -= force_to_subtract;
        ext_force.torque -= torque_to_subtract;
    }
}

/// Apply controller forces at the end of each tick.
///
/// This system runs AFTER all controller force systems and remembers what it
/// applied for the next tick's subtraction.
pub fn apply_controller_forces(mut q: Query<(&mut ExternalForce, &mut DoofusController)>) {
    for (mut ext_force, mut controller) in &mut q {
        let (force_to_apply, torque_to_apply) = controller.finalize_frame();

        ext_force.force += force_to_apply;
        ext_force.torque += torque_to_apply;
    }
}

/// Bundle for creating a doofus with Rapier3D physics.
///
/// Provides the Rapier components the controller drives. Rapier's own gravity
/// is disabled through [`GravityScale`] because the controller applies its
/// own, scaled by `gravity_multiplier`.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use doofus_controller::prelude::*;
/// use doofus_controller::rapier::Rapier3dDoofusBundle;
///
/// fn spawn_doofus(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         DoofusBundle::new(MovementConfig::default()),
///         Rapier3dDoofusBundle::new(),
///         Collider::ball(0.5),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `locked_axes`: Empty, the erector keeps the body upright
/// - `damping`: Zero, the levitator and erector carry their own dampers
/// - `gravity_scale`: `0.0`
#[derive(Bundle)]
pub struct Rapier3dDoofusBundle {
    /// The rigid body type. Should be [`RigidBody::Dynamic`] for a doofus.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Updated by Rapier each physics step.
    pub velocity: Velocity,
    /// Forces applied this tick. Controller forces are flushed into it.
    pub external_force: ExternalForce,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
    /// Computed mass properties. Rapier updates this from the collider.
    pub mass_properties: ReadMassProperties,
    /// Engine gravity scale, zero because gravity is applied by the controller.
    pub gravity_scale: GravityScale,
}

impl Default for Rapier3dDoofusBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dDoofusBundle {
    /// Create a bundle with free rotation.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            locked_axes: LockedAxes::empty(),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.0,
            },
            // Rapier will update this based on collider after first physics step
            mass_properties: ReadMassProperties::default(),
            gravity_scale: GravityScale(0.0),
        }
    }

    /// Create a bundle that can only turn around the vertical axis.
    ///
    /// The erector torque then only steers the heading; tilting is impossible.
    pub fn tilt_locked() -> Self {
        Self {
            locked_axes: LockedAxes::ROTATION_LOCKED_X | LockedAxes::ROTATION_LOCKED_Z,
            ..Self::new()
        }
    }

    /// Set the rigid body type.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients for velocity reduction.
    ///
    /// Rapier damping acts on top of the controller's spring dampers.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
