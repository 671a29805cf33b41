use glam::Vec3;

use crate::entity::Interactable;

/// Proof of write access to [`Tracking`]'s externally administered fields.
///
/// Only [`SpatialTracker`] can mint one.
#[derive(Debug)]
pub struct TrackerKey {
    _private: (),
}

/// Motion state of an interactable.
///
/// Velocity and previous position belong to the spatial tracker. The
/// corrective delta is the one field users may set; it is added to the next
/// computed velocity and then consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tracking {
    velocity: Vec3,
    previous_position: Vec3,
    corrective_delta: Option<Vec3>,
}

impl Tracking {
    pub(crate) fn starting_at(position: Vec3) -> Self {
        Self {
            previous_position: position,
            ..Self::default()
        }
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    pub fn corrective_delta(&self) -> Option<Vec3> {
        self.corrective_delta
    }

    /// Nudge the next velocity computation by `delta`.
    pub fn set_corrective_delta(&mut self, delta: Vec3) {
        self.corrective_delta = Some(delta);
    }

    pub fn clear_corrective_delta(&mut self) {
        self.corrective_delta = None;
    }

    /// Overwrite velocity and previous position. Tracker only.
    pub fn record(&mut self, _key: &TrackerKey, velocity: Vec3, previous_position: Vec3) {
        self.velocity = velocity;
        self.previous_position = previous_position;
    }
}

/// The external system that administers [`Tracking`] each frame.
#[derive(Debug)]
pub struct SpatialTracker {
    key: TrackerKey,
}

impl Default for SpatialTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialTracker {
    pub fn new() -> Self {
        Self {
            key: TrackerKey { _private: () },
        }
    }

    /// Update one entity's velocity from its displacement over `dt` seconds.
    ///
    /// Returns false, leaving state untouched, for destroyed entities or a
    /// non-positive `dt`.
    pub fn track<I: Interactable + ?Sized>(&self, entity: &mut I, dt: f32) -> bool {
        if !(dt.is_finite() && dt > 0.0) || entity.is_destroyed() {
            return false;
        }
        let position = entity.core().root_position();
        let tracking = entity.core_mut().tracking_mut();
        let correction = tracking.corrective_delta.take().unwrap_or(Vec3::ZERO);
        let velocity = (position - tracking.previous_position) / dt + correction;
        tracking.record(&self.key, velocity, position);
        true
    }
}
