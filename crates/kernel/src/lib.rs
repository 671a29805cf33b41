//! World Kernel: authoritative set of live world objects and frame stepping.
//!
//! # Invariants
//! - An object exists iff it is present in the world; destruction elsewhere is
//!   always expressed as a despawn here.
//! - Entity ids are never reused within one world.
//! - All state mutations flow through explicit operations and are logged.

pub mod world;

pub use world::{EntityData, SharedWorld, World, WorldEvent};
