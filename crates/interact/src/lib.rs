//! Interactables: world entities that publish themselves in a shared,
//! capability-indexed registry.
//!
//! # Invariants
//! - An interactable is destroyed iff its world object no longer exists.
//! - Every accessor on a destroyed interactable returns a default; none panic.
//! - Registry entries exist only for live owners; destruction removes them.
//! - Velocity and previous position are written only by [`SpatialTracker`].

mod capability;
mod entity;
mod registry;
mod tracking;

pub use capability::{Capability, PropertyTag};
pub use entity::{
    DestructionRecord, HandlerChange, Interactable, InteractableCore, InteractableDesc, Possession,
};
pub use registry::{InteractableRegistry, SharedRegistry};
pub use tracking::{SpatialTracker, TrackerKey, Tracking};

pub fn crate_info() -> &'static str {
    "habitat-interact v0.1.0"
}
