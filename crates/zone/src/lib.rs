//! Zones: bounded circular regions agents can be placed in or land on.
//!
//! # Invariants
//! - A returned position lies within min(requested cap, zone radius) of the
//!   zone center, measured in the zone plane.
//! - A search never probes more than its attempt budget.
//! - An open zone is registered under every capability it declares; a closed,
//!   destroyed or dropped zone under none.

mod being;
mod config;
mod finder;
mod zone;

pub use being::BeingProfile;
pub use config::{DEFAULT_MAX_ATTEMPTS, FinderConfig, PositionQuery};
pub use finder::{FreePositionFinder, Placement, Verdict, ZoneGeometry, classify_probe};
pub use zone::{BirdPoints, NamedPoint, Zone, ZoneDesc, ZoneError, ZoneVariant};

pub fn crate_info() -> &'static str {
    "habitat-zone v0.1.0"
}
