//! Controller lifecycle state machine and its messages.
//!
//! ```text
//!   Uninitialized --initialize--> Inactive --game start--> Active --fell--> Dead
//!                                    ^                                      |
//!                                    +---------------reset------------------+
//! ```
//!
//! Only `Active` simulates. `Inactive` and `Dead` turn every tick into a
//! velocity-zeroing tick. Orchestration talks to the controller through the
//! [`GameStarted`] and [`ResetDoofus`] messages and listens for [`DoofusDied`].

use bevy::prelude::*;
use thiserror::Error;

use crate::config::{ConfigError, MovementConfig};
use crate::intent::MoveInput;

/// Lifecycle state of a doofus controller.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// No config or input source bound yet.
    #[default]
    Uninitialized,
    /// Bound, waiting for the game to start (or reset after death).
    Inactive,
    /// Simulating.
    Active,
    /// Fell below the death threshold.
    Dead,
}

/// Error returned by refused lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    /// `initialize` was called without a movement config.
    #[error("cannot initialize: movement config is missing")]
    MissingConfig,

    /// `initialize` was called without an input source.
    #[error("cannot initialize: input source is missing")]
    MissingInput,

    /// `initialize` was called with a config that breaks its invariants.
    #[error("cannot initialize: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The call needs an initialized controller.
    #[error("controller is not initialized")]
    NotInitialized,

    /// The call is not valid from the current state.
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: LifecycleState,
        action: &'static str,
    },
}

/// Pose recorded at initialization and restored on reset.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SpawnPose {
    /// World position.
    pub position: Vec3,
    /// World rotation.
    pub rotation: Quat,
}

impl Default for SpawnPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl SpawnPose {
    /// Create a spawn pose.
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

/// Lifecycle guard component.
///
/// Plain state plus transition methods; the systems in
/// [`crate::systems`] drive it from messages and the fall check.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct DoofusLifecycle {
    state: LifecycleState,
    spawn: Option<SpawnPose>,
    deaths: u32,
}

impl DoofusLifecycle {
    /// Create an uninitialized lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Spawn pose recorded at initialization.
    #[inline]
    pub fn spawn_pose(&self) -> Option<SpawnPose> {
        self.spawn
    }

    /// Number of deaths so far.
    #[inline]
    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Whether the controller may apply forces this tick.
    ///
    /// True only when `Active`, which implies config and input were bound at
    /// initialization. The systems additionally require a rigid body.
    #[inline]
    pub fn can_simulate(&self) -> bool {
        self.state == LifecycleState::Active && self.spawn.is_some()
    }

    /// Bind config and input source: `Uninitialized -> Inactive`.
    ///
    /// Refused (state unchanged) when either reference is missing, when the
    /// config fails validation, or when already initialized.
    pub fn initialize(
        &mut self,
        config: Option<&MovementConfig>,
        input: Option<&MoveInput>,
        spawn: SpawnPose,
    ) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                action: "initialize",
            });
        }

        let config = config.ok_or(LifecycleError::MissingConfig)?;
        input.ok_or(LifecycleError::MissingInput)?;
        config.validate()?;

        self.spawn = Some(spawn);
        self.state = LifecycleState::Inactive;
        Ok(())
    }

    /// Arm movement: `Inactive -> Active`.
    ///
    /// A no-op when already `Active`. Refused when uninitialized or dead.
    pub fn notify_game_start(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Uninitialized => Err(LifecycleError::NotInitialized),
            LifecycleState::Inactive => {
                self.state = LifecycleState::Active;
                Ok(())
            }
            LifecycleState::Active => Ok(()),
            LifecycleState::Dead => Err(LifecycleError::InvalidTransition {
                from: LifecycleState::Dead,
                action: "start",
            }),
        }
    }

    /// Force `Inactive` and return the pose to restore.
    ///
    /// Valid from every initialized state. An uninitialized controller has no
    /// recorded spawn pose, so the call is refused and nothing changes.
    pub fn reset(&mut self) -> Result<SpawnPose, LifecycleError> {
        let spawn = self.spawn.ok_or(LifecycleError::NotInitialized)?;
        self.state = LifecycleState::Inactive;
        Ok(spawn)
    }

    /// `Active -> Dead`, at most once per life.
    ///
    /// Returns whether the transition happened; the died message must only be
    /// sent when it did.
    pub fn notify_death(&mut self) -> bool {
        if self.state != LifecycleState::Active {
            return false;
        }
        self.state = LifecycleState::Dead;
        self.deaths += 1;
        true
    }
}

// ==================== Messages ====================

/// Consumed: the game has started, arm every initialized doofus.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct GameStarted;

/// Consumed: respawn a doofus (or every doofus when `entity` is `None`).
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ResetDoofus {
    /// Target doofus, `None` for all.
    pub entity: Option<Entity>,
}

impl ResetDoofus {
    /// Reset every doofus.
    pub fn all() -> Self {
        Self { entity: None }
    }

    /// Reset a single doofus.
    pub fn entity(entity: Entity) -> Self {
        Self {
            entity: Some(entity),
        }
    }

    /// Whether this request targets `entity`.
    pub fn targets(&self, entity: Entity) -> bool {
        self.entity.is_none_or(|target| target == entity)
    }
}

/// Exposed: a doofus fell below its death threshold. Sent at most once per life.
#[derive(Event, Debug, Clone, Copy)]
pub struct DoofusDied {
    /// The doofus that died.
    pub entity: Entity,
    /// Where it was when the fall check fired.
    pub position: Vec3,
}
