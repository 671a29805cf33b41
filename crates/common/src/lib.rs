//! Shared types for the habitat workspace: identities, transforms, layer masks
//! and the random source consumed by stochastic queries.

mod random;
mod types;

pub use random::{RandomSource, RngSource};
pub use types::{EntityId, Extents, LayerMask, Transform};
