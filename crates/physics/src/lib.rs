//! Physics queries: collider shapes and the sphere probe used by placement.
//!
//! # Invariants
//! - Probing is a pure query; it never mutates colliders.
//! - Colliders outside the query's layer mask are invisible to it.
//! - Among equally near hits, the lower collider id wins.

mod collider;
mod probe;

pub use collider::{Collider, ColliderId, ColliderSet, Shape};
pub use probe::{CollisionQuery, ProbeHit};

pub fn crate_info() -> &'static str {
    "habitat-physics v0.1.0"
}
