use habitat_common::{EntityId, LayerMask};
use serde::{Deserialize, Serialize};

use crate::config::PositionQuery;

/// Placement-relevant configuration of an agent requesting positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeingProfile {
    pub id: EntityId,
    pub clearance_radius: f32,
    /// Static obstacle layers the agent must avoid.
    pub obstacle_layers: LayerMask,
    /// Layers other agents live on.
    pub agent_layers: LayerMask,
}

impl BeingProfile {
    /// Mask used by zone searches: static obstacles and other agents.
    pub fn combined_mask(&self) -> LayerMask {
        self.obstacle_layers | self.agent_layers
    }

    /// Query using this agent's own clearance and default limits.
    pub fn query(&self) -> PositionQuery {
        PositionQuery::new(self.clearance_radius)
    }
}
