//! Game Logic Module
//!
//! Everything that mutates the shared world. Peers run the same code on the
//! same events, so their worlds stay in step.
//!
//! ## Module Structure
//!
//! - `entity`: Farmer, carrots and the static map pieces
//! - `input`: Stick quantization and input sources
//! - `services`: Injected audio and haptics
//! - `state`: The shared world and its body arena
//! - `map`: Deterministic map generation
//! - `reducer`: Applies one event to the world
//! - `collision`: Turns contacts into events
//! - `wander`: Host-side baby carrot steering
//! - `tick`: Fixed-step loop driver
//! - `controller`: Ties session, reducer and loop together

pub mod entity;
pub mod input;
pub mod services;
pub mod state;
pub mod map;
pub mod reducer;
pub mod collision;
pub mod wander;
pub mod tick;
pub mod controller;

// Re-export key types
pub use entity::{EntityRef, EntityState};
pub use input::{InputFrame, InputSource, ScriptedInput, MOVE_LUT};
pub use services::{Audio, Cue, CueLog, Haptics, Services};
pub use state::SharedWorld;
pub use map::GameConfig;
pub use reducer::{apply_event, ReduceContext, ReduceOutcome, ReducerOptions, SkipReason};
pub use tick::{FixedStepDriver, LoopConfig, LoopPhases};
pub use controller::{ControllerError, GameController, RoundWinner};
