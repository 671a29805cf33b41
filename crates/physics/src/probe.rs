use glam::Vec3;
use habitat_common::LayerMask;

use crate::collider::ColliderId;

/// Nearest contact reported by a sphere probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    /// Contact point on the collider surface.
    pub point: Vec3,
    pub collider: ColliderId,
    /// Distance the sphere travelled before touching.
    pub distance: f32,
}

/// Collision query primitive consumed by placement.
pub trait CollisionQuery {
    /// Sweep a sphere of `radius` from `origin` along `direction` for up to
    /// `max_distance`, considering only colliders on `mask`. Returns the
    /// nearest hit, or `None`.
    fn probe(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit>;
}

impl<T: CollisionQuery + ?Sized> CollisionQuery for &T {
    fn probe(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit> {
        (**self).probe(origin, radius, direction, max_distance, mask)
    }
}
