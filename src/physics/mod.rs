//! Physics surface consumed by the sync layer.
//!
//! Only what the ownership ledger and the game controller need: bodies with
//! user-data tags, integration gated per body, and contact reporting.

pub mod world;

pub use world::{BodyDef, BodyHandle, BodyKind, Contact, ObstacleWorld, StepReport};
