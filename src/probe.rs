//! Ground probe request and result structures.
//!
//! The probe itself is issued by the physics backend; these types describe
//! what to cast and what came back.

use bevy::prelude::*;

use crate::config::MovementConfig;

/// A downward sphere sweep to issue this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundProbeRequest {
    /// Origin of the sweep (the body position).
    pub origin: Vec3,
    /// Sweep direction (normalized, the "down" axis).
    pub direction: Vec3,
    /// Radius of the swept sphere. Zero means a ray.
    pub radius: f32,
    /// Maximum sweep distance.
    pub max_distance: f32,
    /// Collision group filter bits.
    pub filter: u32,
}

impl GroundProbeRequest {
    /// Build the probe for a body at `origin` using the configured shape and range.
    pub fn new(origin: Vec3, up: Vec3, config: &MovementConfig) -> Self {
        Self {
            origin,
            direction: -up.normalize_or(Vec3::Y),
            radius: config.ground_probe_radius,
            max_distance: config.ground_check_range,
            filter: config.ground_layer_filter,
        }
    }

    /// Whether the sweep degrades to a ray cast.
    #[inline]
    pub fn is_ray(&self) -> bool {
        self.radius <= 0.0
    }

    /// Distance from the origin to the contact for a sweep that travelled `travel`.
    ///
    /// A ray's travel already ends at the contact. A sphere stops when its
    /// surface touches, one radius short of the contact point.
    #[inline]
    pub fn contact_distance(&self, travel: f32) -> f32 {
        if self.is_ray() {
            travel
        } else {
            travel + self.radius
        }
    }

    /// Turn a backend hit distance into a probe result.
    ///
    /// `hit_distance` is the contact distance. Hits whose sweep travelled
    /// beyond `max_distance`, or with non-finite distance, count as misses.
    pub fn resolve(&self, hit_distance: Option<f32>) -> GroundProbeResult {
        let limit = self.contact_distance(self.max_distance);
        match hit_distance {
            Some(d) if d.is_finite() && d <= limit => GroundProbeResult::hit(d),
            _ => GroundProbeResult::miss(),
        }
    }
}

/// Result of the per-tick ground probe.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct GroundProbeResult {
    /// Whether a supporting surface was found within range.
    pub is_grounded: bool,
    /// Distance from the probe origin to the contact along the down axis.
    /// Only meaningful when `is_grounded`.
    pub distance: f32,
}

impl GroundProbeResult {
    /// A probe that found ground at `distance`.
    pub fn hit(distance: f32) -> Self {
        Self {
            is_grounded: true,
            distance,
        }
    }

    /// A probe that found nothing.
    pub fn miss() -> Self {
        Self::default()
    }

    /// Distance with the probe radius removed, if grounded.
    pub fn surface_distance(&self, probe_radius: f32) -> Option<f32> {
        self.is_grounded.then(|| self.distance - probe_radius)
    }
}
