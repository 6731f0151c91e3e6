//! Network Layer
//!
//! Wire codec, event registry, packet framing and the peer session.
//! Everything above the transport is synchronous and polled from the
//! fixed-step loop.

pub mod codec;
pub mod events;
pub mod registry;
pub mod protocol;
pub mod transport;
pub mod session;

pub use codec::{DecodeError, WireReader, WireWriter};
pub use events::{GameEvent, ResetKind, WireEvent};
pub use registry::{EventRegistry, RegistryError};
pub use protocol::{decode_packet, event_packet, BodySnapshot, ControlMessage, Packet, SnapshotBatch};
pub use transport::{LoopbackHub, LoopbackTransport, Transport, TransportError, TransportEvent};
pub use session::{InboundEvent, Role, Session, SessionConfig, SessionError, SessionStatus};
