//! Physics synchronization between peers.

pub mod ownership;

pub use ownership::{OwnedObstacle, OwnershipConfig, OwnershipError, OwnershipLedger};
