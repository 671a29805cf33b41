use serde::{Deserialize, Serialize};

/// A role an interactable exposes to other systems.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Every registered entity carries this one.
    Interactable,
    WalkableZone,
    /// Zone with discrete landing and takeoff points.
    BirdZone,
    Custom(String),
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactable => f.write_str("interactable"),
            Self::WalkableZone => f.write_str("walkable_zone"),
            Self::BirdZone => f.write_str("bird_zone"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// Integer property tag declared on an interactable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyTag(pub i32);
