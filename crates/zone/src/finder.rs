use glam::{Quat, Vec3};
use habitat_common::{EntityId, LayerMask, RandomSource, Transform};
use habitat_physics::{ColliderId, CollisionQuery, ProbeHit};
use serde::Serialize;

use crate::config::{FinderConfig, PositionQuery};

/// What the finder needs to know about a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneGeometry {
    pub zone: EntityId,
    /// Center and orientation; the center height is the zone surface height.
    pub transform: Transform,
    pub max_radius: f32,
    /// The zone's own floor. Hitting it is expected, not an obstruction.
    pub ground: ColliderId,
}

/// Outcome of a free-position search.
///
/// `position` is only meaningful when `found` is true; it is zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub found: bool,
    pub position: Vec3,
    /// Probes performed.
    pub attempts: u32,
}

impl Placement {
    fn success(position: Vec3, attempts: u32) -> Self {
        Self {
            found: true,
            position,
            attempts,
        }
    }

    pub(crate) fn failure(attempts: u32) -> Self {
        Self {
            found: false,
            position: Vec3::ZERO,
            attempts,
        }
    }

    pub fn position(&self) -> Option<Vec3> {
        self.found.then_some(self.position)
    }
}

/// Interpretation of one probe result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Nothing under the candidate.
    Clear,
    /// The first thing under the candidate is the zone floor, at this height.
    OwnGround(f32),
    Blocked(ColliderId),
}

impl Verdict {
    /// Height an accepted candidate snaps to, or `None` when blocked.
    /// `zone_height` applies when nothing was hit.
    pub fn snap_height(self, zone_height: f32) -> Option<f32> {
        match self {
            Self::Clear => Some(zone_height),
            Self::OwnGround(height) => Some(height),
            Self::Blocked(_) => None,
        }
    }
}

/// Decide whether a probe result leaves the candidate free.
pub fn classify_probe(hit: Option<&ProbeHit>, ground: ColliderId) -> Verdict {
    match hit {
        None => Verdict::Clear,
        Some(hit) if hit.collider == ground => Verdict::OwnGround(hit.point.y),
        Some(hit) => Verdict::Blocked(hit.collider),
    }
}

/// Randomized, bounded search for an unobstructed point inside a zone.
///
/// Best effort: a crowded zone may be reported full even when free space
/// exists.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FreePositionFinder {
    config: FinderConfig,
}

impl FreePositionFinder {
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Effective sampling bound for `query` in `zone`.
    pub fn effective_bound(zone: &ZoneGeometry, query: &PositionQuery) -> f32 {
        query.max_distance.min(zone.max_radius)
    }

    pub fn find<Q, R>(
        &self,
        zone: &ZoneGeometry,
        mask: LayerMask,
        query: &PositionQuery,
        collision: &Q,
        rng: &mut R,
    ) -> Placement
    where
        Q: CollisionQuery + ?Sized,
        R: RandomSource + ?Sized,
    {
        let _span = tracing::debug_span!("free_position_search", zone = %zone.zone).entered();

        let clearance = query.clearance_radius;
        if !(clearance.is_finite() && clearance > 0.0) {
            tracing::debug!(clearance, "rejecting query with invalid clearance");
            return Placement::failure(0);
        }

        let span = (Self::effective_bound(zone, query) - clearance).max(0.0);
        let lift = clearance * self.config.probe_lift_factor;

        for attempt in 1..=query.max_attempts {
            let angle = rng.uniform(-180.0, 180.0).to_radians();
            let distance = rng.uniform_inclusive(0.0, span);
            let local = Quat::from_rotation_y(angle) * (Vec3::Z * distance);
            let candidate = zone.transform.position + zone.transform.rotation * local;

            let hit = collision.probe(candidate + Vec3::Y * lift, clearance, Vec3::NEG_Y, lift, mask);
            let verdict = classify_probe(hit.as_ref(), zone.ground);
            match verdict.snap_height(zone.transform.position.y) {
                Some(height) => {
                    let position = candidate.with_y(height);
                    tracing::debug!(attempt, ?position, ?verdict, "free position found");
                    return Placement::success(position, attempt);
                }
                None => {
                    tracing::trace!(attempt, ?verdict, ?candidate, "candidate blocked");
                }
            }
        }

        tracing::debug!(attempts = query.max_attempts, "free position search exhausted");
        Placement::failure(query.max_attempts)
    }
}
