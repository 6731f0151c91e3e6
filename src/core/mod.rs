//! Core deterministic primitives.
//!
//! Everything here produces identical results on every peer, which is what
//! lets independently generated maps and wire-carried transforms agree.

pub mod fixed;
pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher};
