use serde::{Deserialize, Serialize};

/// Attempts a free-position search makes when the caller does not say.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Tuning of the free-position search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Budget used by [`FinderConfig::query`].
    pub default_max_attempts: u32,
    /// Probe start height and length, in multiples of the clearance radius.
    pub probe_lift_factor: f32,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
            probe_lift_factor: 4.0,
        }
    }
}

impl FinderConfig {
    /// Query for `clearance_radius` using this config's attempt budget.
    pub fn query(&self, clearance_radius: f32) -> PositionQuery {
        PositionQuery::new(clearance_radius).with_max_attempts(self.default_max_attempts)
    }
}

/// One free-position request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionQuery {
    pub clearance_radius: f32,
    /// Cap on the distance from the zone center; clamped to the zone radius.
    pub max_distance: f32,
    pub max_attempts: u32,
}

impl PositionQuery {
    /// Unbounded distance, default attempt budget.
    pub fn new(clearance_radius: f32) -> Self {
        Self {
            clearance_radius,
            max_distance: f32::INFINITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}
