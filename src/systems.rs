//! Core controller systems.
//!
//! These systems implement the doofus locomotion behavior. They are generic
//! over the physics backend so different physics engines can be plugged in.
//! Per tick they run in the order of [`DoofusControllerSet`](crate::DoofusControllerSet):
//! lifecycle gate, sensors, gravity, levitation, movement, orientation and
//! finally the fall check.

use bevy::prelude::*;

use crate::backend::DoofusPhysicsBackend;
use crate::config::MovementConfig;
use crate::controller::{DoofusController, HeadingMemory};
use crate::forces;
use crate::intent::MoveInput;
use crate::lifecycle::{
    DoofusDied, DoofusLifecycle, GameStarted, LifecycleError, LifecycleState, ResetDoofus,
    SpawnPose,
};
use crate::probe::GroundProbeResult;
use crate::state::{Airborne, Grounded};

/// Collect the doofuses that may apply forces this tick.
///
/// Requires an `Active` lifecycle, a bound config and a rigid body.
fn simulating<B: DoofusPhysicsBackend>(world: &mut World) -> Vec<(Entity, MovementConfig)> {
    let candidates: Vec<(Entity, MovementConfig)> = world
        .query::<(Entity, &MovementConfig, &DoofusLifecycle, &DoofusController)>()
        .iter(world)
        .filter(|(_, _, lifecycle, _)| lifecycle.can_simulate())
        .map(|(e, config, _, _)| (e, *config))
        .collect();

    candidates
        .into_iter()
        .filter(|(entity, _)| B::has_body(world, *entity))
        .collect()
}

// ==================== Lifecycle ====================

/// Bind config and input for every uninitialized doofus.
///
/// The spawn pose is the body pose at the moment initialization succeeds, so
/// a doofus without a rigid body waits until one is attached. Failures are
/// reported once per entity and retried every tick, so adding the missing
/// component later completes the initialization.
pub fn initialize_doofus_controllers<B: DoofusPhysicsBackend>(world: &mut World) {
    let pending: Vec<(Entity, Option<MovementConfig>, Option<MoveInput>)> = world
        .query::<(
            Entity,
            &DoofusLifecycle,
            Option<&MovementConfig>,
            Option<&MoveInput>,
        )>()
        .iter(world)
        .filter(|(_, lifecycle, _, _)| lifecycle.state() == LifecycleState::Uninitialized)
        .map(|(e, _, config, input)| (e, config.copied(), input.copied()))
        .collect();

    for (entity, config, input) in pending {
        if !B::has_body(world, entity) {
            if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
                if !controller.init_failure_reported {
                    controller.init_failure_reported = true;
                    warn!("Doofus {:?} has no rigid body, initialization deferred", entity);
                }
            }
            continue;
        }

        let spawn = SpawnPose::new(
            B::get_position(world, entity),
            B::get_rotation(world, entity),
        );

        let result = match world.get_mut::<DoofusLifecycle>(entity) {
            Some(mut lifecycle) => lifecycle.initialize(config.as_ref(), input.as_ref(), spawn),
            None => continue,
        };

        let Some(mut controller) = world.get_mut::<DoofusController>(entity) else {
            continue;
        };

        match result {
            Ok(()) => {
                controller.init_failure_reported = false;
                info!(
                    "Doofus {:?} initialized at {:?}, waiting for game start",
                    entity, spawn.position
                );
            }
            Err(err) => {
                if !controller.init_failure_reported {
                    controller.init_failure_reported = true;
                    warn!("Doofus {:?} not initialized: {}", entity, err);
                }
            }
        }
    }
}

/// Arm every initialized doofus when the game starts.
pub fn handle_game_started(
    mut events: EventReader<GameStarted>,
    mut q_doofus: Query<(Entity, &mut DoofusLifecycle)>,
) {
    if events.read().count() == 0 {
        return;
    }

    for (entity, mut lifecycle) in &mut q_doofus {
        let previous = lifecycle.state();
        match lifecycle.notify_game_start() {
            Ok(()) if previous != lifecycle.state() => {
                info!("Doofus {:?} activated", entity);
            }
            Ok(()) => {}
            Err(LifecycleError::NotInitialized) => {
                debug!("Game start ignored for uninitialized doofus {:?}", entity);
            }
            Err(err) => {
                warn!("Game start refused for doofus {:?}: {}", entity, err);
            }
        }
    }
}

/// Mark doofuses targeted by a [`ResetDoofus`] message.
///
/// The reset itself needs the backend and is applied by [`apply_resets`].
pub fn handle_reset_requests(
    mut events: EventReader<ResetDoofus>,
    mut q_controllers: Query<(Entity, &mut DoofusController)>,
) {
    for request in events.read() {
        for (entity, mut controller) in &mut q_controllers {
            if request.targets(entity) {
                controller.reset_pending = true;
            }
        }
    }
}

/// Restore the spawn pose of every doofus with a pending reset.
///
/// Position and rotation go back to the spawn pose, both velocities are
/// zeroed and the lifecycle returns to `Inactive`.
pub fn apply_resets<B: DoofusPhysicsBackend>(world: &mut World) {
    let pending: Vec<Entity> = world
        .query::<(Entity, &DoofusController)>()
        .iter(world)
        .filter(|(_, controller)| controller.reset_pending)
        .map(|(e, _)| e)
        .collect();

    for entity in pending {
        if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
            controller.reset_pending = false;
        }

        let result = match world.get_mut::<DoofusLifecycle>(entity) {
            Some(mut lifecycle) => lifecycle.reset(),
            None => Err(LifecycleError::NotInitialized),
        };

        let spawn = match result {
            Ok(spawn) => spawn,
            Err(err) => {
                warn!("Reset refused for doofus {:?}: {}", entity, err);
                continue;
            }
        };

        if B::has_body(world, entity) {
            B::set_position(world, entity, spawn.position);
            B::set_rotation(world, entity, spawn.rotation);
            B::set_velocity(world, entity, Vec3::ZERO);
            B::set_angular_velocity(world, entity, Vec3::ZERO);
        }

        if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
            controller.clear_tick();
            controller.heading = HeadingMemory::default();
            controller.ground = GroundProbeResult::miss();
            controller.pending_death = None;
        }

        info!("Doofus {:?} reset to {:?}", entity, spawn.position);
    }
}

/// Hold idle doofuses in place.
///
/// `Inactive` and `Dead` doofuses get both velocities zeroed and no force.
/// An `Active` doofus without a rigid body is skipped and reported once.
pub fn hold_idle_doofuses<B: DoofusPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, LifecycleState, bool)> = world
        .query::<(Entity, &DoofusLifecycle, &DoofusController)>()
        .iter(world)
        .map(|(e, lifecycle, controller)| {
            (e, lifecycle.state(), controller.missing_body_reported)
        })
        .collect();

    for (entity, state, missing_body_reported) in entities {
        let has_body = B::has_body(world, entity);

        if !has_body {
            let report = state == LifecycleState::Active && !missing_body_reported;
            if report {
                warn!("Doofus {:?} has no rigid body, skipping simulation", entity);
            }
            if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
                controller.missing_body_reported |= report;
                controller.clear_tick();
            }
            continue;
        }

        if missing_body_reported {
            if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
                controller.missing_body_reported = false;
            }
        }

        match state {
            LifecycleState::Inactive | LifecycleState::Dead => {
                B::set_velocity(world, entity, Vec3::ZERO);
                B::set_angular_velocity(world, entity, Vec3::ZERO);
                if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
                    controller.clear_tick();
                }
            }
            LifecycleState::Uninitialized | LifecycleState::Active => {}
        }
    }
}

// ==================== Forces ====================

/// Apply the replacement gravity force.
///
/// The force is stored on the controller so levitation can cancel it in the
/// same tick.
pub fn apply_gravity_force<B: DoofusPhysicsBackend>(world: &mut World) {
    for (entity, config) in simulating::<B>(world) {
        let mass = B::get_mass(world, entity);

        let gravity = {
            let Some(mut controller) = world.get_mut::<DoofusController>(entity) else {
                continue;
            };
            let gravity =
                forces::gravity_force(controller.engine_gravity, mass, config.gravity_multiplier);
            controller.gravity_force = gravity;
            gravity
        };

        B::apply_force(world, entity, gravity);
    }
}

/// Apply the levitation spring that holds the doofus at ride height.
///
/// Nothing is applied when the ground probe missed.
pub fn apply_levitation_force<B: DoofusPhysicsBackend>(world: &mut World) {
    for (entity, config) in simulating::<B>(world) {
        let velocity = B::get_velocity(world, entity);

        let (grounded, force) = {
            let Some(mut controller) = world.get_mut::<DoofusController>(entity) else {
                continue;
            };
            let force = forces::levitation_force(
                &controller.ground,
                velocity,
                controller.up(),
                controller.gravity_force,
                &config,
            );
            controller.diagnostics.levitation_force = force;
            (controller.is_grounded(), force)
        };

        if grounded {
            B::apply_force(world, entity, force);
        }
    }
}

/// Drive the horizontal velocity toward the input goal velocity.
///
/// The force is applied above the center of mass by `lean_offset` so the body
/// leans into acceleration. Nonzero input also updates the heading memory.
pub fn apply_movement_force<B: DoofusPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    for (entity, config) in simulating::<B>(world) {
        let world_input = world
            .get::<MoveInput>(entity)
            .map(MoveInput::to_world_plane)
            .unwrap_or(Vec3::ZERO);
        let velocity = B::get_velocity(world, entity);
        let position = B::get_position(world, entity);
        let mass = B::get_mass(world, entity);

        let solution = {
            let Some(mut controller) = world.get_mut::<DoofusController>(entity) else {
                continue;
            };
            controller.heading.observe(world_input);

            let solution = forces::solve_movement(
                world_input,
                velocity,
                position,
                controller.up(),
                mass,
                dt,
                &config,
            );
            controller.diagnostics.movement = solution;
            solution
        };

        B::apply_force_at_point(world, entity, solution.force, solution.application_point);
    }
}

/// Rotate the doofus upright and toward its remembered heading.
pub fn apply_orientation_torque<B: DoofusPhysicsBackend>(world: &mut World) {
    for (entity, config) in simulating::<B>(world) {
        let rotation = B::get_rotation(world, entity);
        let angular_velocity = B::get_angular_velocity(world, entity);

        let torque = {
            let Some(mut controller) = world.get_mut::<DoofusController>(entity) else {
                continue;
            };
            let torque = forces::orientation_torque(
                rotation,
                controller.heading.direction(),
                controller.up(),
                angular_velocity,
                &config,
            );
            controller.diagnostics.orientation_torque = torque;
            torque
        };

        B::apply_torque(world, entity, torque);
    }
}

// ==================== Death ====================

/// Kill doofuses that fell below their death threshold.
///
/// Runs after the forces of the tick. The transition happens at most once
/// per life; the died message is sent by [`emit_death_messages`].
pub fn check_fall_death<B: DoofusPhysicsBackend>(world: &mut World) {
    for (entity, config) in simulating::<B>(world) {
        let position = B::get_position(world, entity);
        if position.y >= config.fall_death_threshold {
            continue;
        }

        let died = world
            .get_mut::<DoofusLifecycle>(entity)
            .is_some_and(|mut lifecycle| lifecycle.notify_death());
        if !died {
            continue;
        }

        if let Some(mut controller) = world.get_mut::<DoofusController>(entity) {
            controller.pending_death = Some(position);
        }
        info!(
            "Doofus {:?} fell below {} at {:?}",
            entity, config.fall_death_threshold, position
        );
    }
}

/// Send [`DoofusDied`] for every death recorded this tick.
pub fn emit_death_messages(
    mut died: EventWriter<DoofusDied>,
    mut q_controllers: Query<(Entity, &mut DoofusController)>,
) {
    for (entity, mut controller) in &mut q_controllers {
        if let Some(position) = controller.pending_death.take() {
            died.write(DoofusDied { entity, position });
        }
    }
}

// ==================== Markers ====================

/// Sync [`Grounded`]/[`Airborne`] markers with the latest ground probe result.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &DoofusController, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, controller, has_grounded, has_airborne) in &q_controllers {
        if controller.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !controller.is_grounded() && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }
    }
}
