use std::collections::BTreeMap;

use glam::Vec3;
use habitat_common::{EntityId, LayerMask};
use serde::{Deserialize, Serialize};

use crate::probe::{CollisionQuery, ProbeHit};

/// Identity of a collider. Distinct from world entity ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub u64);

/// Collider geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Horizontal disc at `center.y`. An infinite radius is a ground plane.
    Ground { center: Vec3, radius: f32 },
    Sphere { center: Vec3, radius: f32 },
    /// Axis-aligned box.
    Box { center: Vec3, half_extents: Vec3 },
}

/// A collider on a single physics layer, optionally owned by a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub id: ColliderId,
    pub layer: LayerMask,
    pub shape: Shape,
    pub owner: Option<EntityId>,
}

/// In-memory collider set answering sphere probes.
///
/// BTreeMap keeps iteration, and therefore tie-breaking, deterministic.
#[derive(Debug, Clone, Default)]
pub struct ColliderSet {
    colliders: BTreeMap<ColliderId, Collider>,
    next_id: u64,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collider and return its id.
    pub fn insert(&mut self, layer: LayerMask, shape: Shape, owner: Option<EntityId>) -> ColliderId {
        self.next_id += 1;
        let id = ColliderId(self.next_id);
        self.colliders.insert(
            id,
            Collider {
                id,
                layer,
                shape,
                owner,
            },
        );
        tracing::trace!(collider = id.0, ?shape, "collider added");
        id
    }

    pub fn remove(&mut self, id: ColliderId) -> Option<Collider> {
        self.colliders.remove(&id)
    }

    /// Remove every collider owned by `owner`. Returns how many were removed.
    pub fn remove_owned_by(&mut self, owner: EntityId) -> usize {
        let before = self.colliders.len();
        self.colliders.retain(|_, c| c.owner != Some(owner));
        before - self.colliders.len()
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(&id)
    }

    /// Move a collider so its center sits at `new_center`.
    pub fn set_center(&mut self, id: ColliderId, new_center: Vec3) -> bool {
        let Some(collider) = self.colliders.get_mut(&id) else {
            return false;
        };
        match &mut collider.shape {
            Shape::Ground { center, .. }
            | Shape::Sphere { center, .. }
            | Shape::Box { center, .. } => *center = new_center,
        }
        true
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.values()
    }
}

impl CollisionQuery for ColliderSet {
    fn probe(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit> {
        if max_distance.is_nan() || max_distance < 0.0 || !(radius.is_finite() && radius > 0.0) {
            return None;
        }
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let mut best: Option<ProbeHit> = None;
        for collider in self.colliders.values() {
            if !mask.intersects(collider.layer) {
                continue;
            }
            let Some((distance, point)) = sweep(&collider.shape, origin, radius, dir) else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            // Strictly nearer only: equal distances keep the lower id.
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(ProbeHit {
                    point,
                    collider: collider.id,
                    distance,
                });
            }
        }
        best
    }
}

/// Sweep a sphere against one shape. Returns travel distance and the contact
/// point on the shape surface.
fn sweep(shape: &Shape, origin: Vec3, radius: f32, dir: Vec3) -> Option<(f32, Vec3)> {
    match *shape {
        Shape::Sphere {
            center,
            radius: shape_radius,
        } => {
            let t = ray_sphere(origin, dir, center, shape_radius + radius)?;
            let at = origin + dir * t;
            let normal = (at - center).normalize_or(Vec3::Y);
            Some((t, center + normal * shape_radius))
        }
        Shape::Ground {
            center,
            radius: disc_radius,
        } => {
            let t = ray_disc(origin, dir, center, disc_radius, radius)?;
            let at = origin + dir * t;
            Some((t, Vec3::new(at.x, center.y, at.z)))
        }
        Shape::Box {
            center,
            half_extents,
        } => {
            let min = center - half_extents;
            let max = center + half_extents;
            let t = ray_aabb(origin, dir, min - Vec3::splat(radius), max + Vec3::splat(radius))?;
            let at = origin + dir * t;
            Some((t, at.clamp(min, max)))
        }
    }
}

fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let offset = origin - center;
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = offset.dot(dir);
    if b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    Some((-b - disc.sqrt()).max(0.0))
}

fn ray_disc(origin: Vec3, dir: Vec3, center: Vec3, disc_radius: f32, thickness: f32) -> Option<f32> {
    let within = |p: Vec3| {
        let dx = p.x - center.x;
        let dz = p.z - center.z;
        dx * dx + dz * dz <= disc_radius * disc_radius
    };
    let height = origin.y - center.y;
    if height.abs() <= thickness {
        return within(origin).then_some(0.0);
    }
    if dir.y == 0.0 {
        return None;
    }
    let target = if height > 0.0 {
        center.y + thickness
    } else {
        center.y - thickness
    };
    let t = (target - origin.y) / dir.y;
    if t < 0.0 {
        return None;
    }
    within(origin + dir * t).then_some(t)
}

fn ray_aabb(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_enter = 0.0f32;
    let mut t_exit = f32::INFINITY;
    for axis in 0..3 {
        let (o, d, lo, hi) = (origin[axis], dir[axis], min[axis], max[axis]);
        if d == 0.0 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = ((lo - o) / d, (hi - o) / d);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }
    Some(t_enter)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIC: LayerMask = LayerMask(1 << 0);
    const AGENTS: LayerMask = LayerMask(1 << 1);

    fn down_probe(set: &ColliderSet, origin: Vec3, mask: LayerMask) -> Option<ProbeHit> {
        set.probe(origin, 0.5, Vec3::NEG_Y, 2.0, mask)
    }

    #[test]
    fn empty_set_never_hits() {
        let set = ColliderSet::new();
        assert!(down_probe(&set, Vec3::new(0.0, 2.0, 0.0), LayerMask::ALL).is_none());
    }

    #[test]
    fn ground_disc_hit_reports_surface_height() {
        let mut set = ColliderSet::new();
        let ground = set.insert(
            STATIC,
            Shape::Ground {
                center: Vec3::new(0.0, 1.5, 0.0),
                radius: 10.0,
            },
            None,
        );
        let hit = down_probe(&set, Vec3::new(2.0, 3.5, 1.0), STATIC).unwrap();
        assert_eq!(hit.collider, ground);
        assert!((hit.point.y - 1.5).abs() < 1e-5);
        assert!((hit.distance - 1.5).abs() < 1e-5);
        assert_eq!((hit.point.x, hit.point.z), (2.0, 1.0));
    }

    #[test]
    fn ground_disc_misses_outside_radius() {
        let mut set = ColliderSet::new();
        set.insert(
            STATIC,
            Shape::Ground {
                center: Vec3::ZERO,
                radius: 1.0,
            },
            None,
        );
        assert!(down_probe(&set, Vec3::new(5.0, 2.0, 0.0), STATIC).is_none());
    }

    #[test]
    fn mask_filters_layers() {
        let mut set = ColliderSet::new();
        set.insert(
            AGENTS,
            Shape::Sphere {
                center: Vec3::ZERO,
                radius: 0.5,
            },
            Some(EntityId(4)),
        );
        let origin = Vec3::new(0.0, 2.0, 0.0);
        assert!(down_probe(&set, origin, STATIC).is_none());
        assert!(down_probe(&set, origin, STATIC | AGENTS).is_some());
    }

    #[test]
    fn nearest_hit_wins() {
        let mut set = ColliderSet::new();
        set.insert(
            STATIC,
            Shape::Ground {
                center: Vec3::ZERO,
                radius: f32::INFINITY,
            },
            None,
        );
        let rock = set.insert(
            STATIC,
            Shape::Box {
                center: Vec3::new(0.0, 0.5, 0.0),
                half_extents: Vec3::splat(0.5),
            },
            None,
        );
        let hit = set
            .probe(Vec3::new(0.0, 3.0, 0.0), 0.5, Vec3::NEG_Y, 5.0, STATIC)
            .unwrap();
        assert_eq!(hit.collider, rock);
        assert!((hit.point.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn equal_distance_prefers_lower_id() {
        let mut set = ColliderSet::new();
        let shape = Shape::Ground {
            center: Vec3::ZERO,
            radius: 3.0,
        };
        let first = set.insert(STATIC, shape, None);
        set.insert(STATIC, shape, None);
        let hit = down_probe(&set, Vec3::new(0.0, 2.0, 0.0), STATIC).unwrap();
        assert_eq!(hit.collider, first);
    }

    #[test]
    fn starting_inside_reports_zero_distance() {
        let mut set = ColliderSet::new();
        set.insert(
            STATIC,
            Shape::Sphere {
                center: Vec3::ZERO,
                radius: 1.0,
            },
            None,
        );
        let hit = down_probe(&set, Vec3::new(0.0, 1.2, 0.0), STATIC).unwrap();
        assert_eq!(hit.distance, 0.0);
    }

    #[test]
    fn out_of_range_is_a_miss() {
        let mut set = ColliderSet::new();
        set.insert(
            STATIC,
            Shape::Sphere {
                center: Vec3::ZERO,
                radius: 0.5,
            },
            None,
        );
        assert!(down_probe(&set, Vec3::new(0.0, 10.0, 0.0), STATIC).is_none());
        // Moving away from the sphere.
        assert!(
            set.probe(Vec3::new(0.0, 2.0, 0.0), 0.5, Vec3::Y, 10.0, STATIC)
                .is_none()
        );
    }

    #[test]
    fn degenerate_inputs_report_no_hit() {
        let mut set = ColliderSet::new();
        set.insert(
            STATIC,
            Shape::Ground {
                center: Vec3::ZERO,
                radius: 5.0,
            },
            None,
        );
        let origin = Vec3::new(0.0, 1.0, 0.0);
        assert!(set.probe(origin, 0.5, Vec3::ZERO, 2.0, STATIC).is_none());
        assert!(set.probe(origin, 0.5, Vec3::NEG_Y, f32::NAN, STATIC).is_none());
        assert!(set.probe(origin, 0.0, Vec3::NEG_Y, 2.0, STATIC).is_none());
        assert!(
            set.probe(origin, 0.5, Vec3::NEG_Y, f32::INFINITY, STATIC)
                .is_some()
        );
    }

    #[test]
    fn remove_owned_by_drops_agent_colliders() {
        let mut set = ColliderSet::new();
        let owner = EntityId(9);
        let sphere = Shape::Sphere {
            center: Vec3::ZERO,
            radius: 0.3,
        };
        set.insert(AGENTS, sphere, Some(owner));
        set.insert(AGENTS, sphere, Some(owner));
        set.insert(STATIC, sphere, None);
        assert_eq!(set.remove_owned_by(owner), 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn moving_a_collider_changes_probe_result() {
        let mut set = ColliderSet::new();
        let id = set.insert(
            AGENTS,
            Shape::Sphere {
                center: Vec3::new(10.0, 0.0, 0.0),
                radius: 0.5,
            },
            None,
        );
        let origin = Vec3::new(0.0, 2.0, 0.0);
        assert!(down_probe(&set, origin, AGENTS).is_none());
        assert!(set.set_center(id, Vec3::ZERO));
        assert_eq!(down_probe(&set, origin, AGENTS).unwrap().collider, id);
    }
}
