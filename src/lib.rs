//! # Rooted Sync
//!
//! Peer synchronization layer for Rooted, a farmer-versus-carrots party game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ROOTED SYNC                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Seeded PRNG, room and round seeds         │
//! │  └── hash.rs     - World hashing for desync checks           │
//! │                                                              │
//! │  network/        - Peer protocol                             │
//! │  ├── codec.rs    - Big-endian field codec                    │
//! │  ├── events.rs   - The twelve game event kinds               │
//! │  ├── registry.rs - Tag ↔ event kind registry                 │
//! │  ├── protocol.rs - Packet framing, snapshots, control        │
//! │  ├── transport.rs- Transport trait, in-process loopback      │
//! │  └── session.rs  - Session state machine, inbound queue      │
//! │                                                              │
//! │  physics/        - Obstacle arena with handle-indexed bodies │
//! │  sync/           - Ownership ledger and snapshot cadence     │
//! │                                                              │
//! │  game/           - Shared world                              │
//! │  ├── state.rs    - SharedWorld, body index                   │
//! │  ├── map.rs      - Deterministic map generation              │
//! │  ├── reducer.rs  - Event reducer                             │
//! │  ├── collision.rs- Contacts to events                        │
//! │  ├── wander.rs   - Host-side baby carrot steering            │
//! │  ├── tick.rs     - Fixed-step loop driver                    │
//! │  └── controller.rs - Per-peer game loop                      │
//! │                                                              │
//! │  config.rs       - JSON configuration                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Agreement
//!
//! Peers never exchange the map. Each one generates it from the room seed
//! and round number, so body handles line up everywhere. After that, worlds
//! agree because every peer reduces the same events in the order its
//! session delivers them, and each body's transform comes from exactly one
//! owner.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;
pub mod physics;
pub mod sync;

// Re-export commonly used types
pub use config::{ConfigError, SyncConfig};
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use game::{GameController, SharedWorld};
pub use network::{GameEvent, Session, SessionStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed steps per second.
pub const TICK_RATE: u32 = 60;

/// Most fixed steps run in a single rendered frame.
pub const MAX_STEPS_PER_FRAME: u32 = 5;
