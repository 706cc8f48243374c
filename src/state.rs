//! State marker components.
//!
//! These components mirror the latest ground probe result. They are
//! added/removed by [`sync_state_markers`](crate::systems::sync_state_markers)
//! so gameplay code can filter on them in queries.

use bevy::prelude::*;

/// Marker component indicating the ground probe found a surface this tick.
///
/// This is a marker component - it has no data, just indicates state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use doofus_controller::prelude::*;
///
/// fn count_hovering(q: Query<(), With<Grounded>>) -> usize {
///     q.iter().count()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the ground probe found nothing in range.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;
