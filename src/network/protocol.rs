//! Packet Framing
//!
//! Every transport message starts with one packet-kind byte:
//!
//! ```text
//! 0x00 control   [ctl tag u8][fields...]         (hand-written codec)
//! 0x01 event     [event tag u8][fields...]       (see events.rs)
//! 0x02 snapshot  [bincode SnapshotBatch]
//! ```

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::network::codec::{DecodeError, WireReader, WireWriter};
use crate::network::events::GameEvent;
use crate::network::registry::{EventRegistry, RegistryError};
use crate::physics::world::BodyHandle;

/// Leading byte of a control packet.
pub const PACKET_CONTROL: u8 = 0x00;
/// Leading byte of an event packet.
pub const PACKET_EVENT: u8 = 0x01;
/// Leading byte of an ownership snapshot packet.
pub const PACKET_SNAPSHOT: u8 = 0x02;

const CONTROL_START_GAME: u8 = 1;

// =============================================================================
// CONTROL
// =============================================================================

/// One roster entry of the handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortUidAssignment {
    /// Peer UUID.
    pub uuid: String,
    /// Compact per-peer id (1-based roster position).
    pub short_uid: u32,
}

/// Session-level messages outside the game event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    /// Host starts the game and assigns short UIDs.
    StartGame {
        /// Assignment per roster member, in roster order.
        assignments: Vec<ShortUidAssignment>,
    },
}

impl ControlMessage {
    /// Encode as a full control packet.
    pub fn to_packet(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.write_u8(PACKET_CONTROL);
        match self {
            ControlMessage::StartGame { assignments } => {
                w.write_u8(CONTROL_START_GAME);
                w.write_i32(assignments.len() as i32);
                for a in assignments {
                    w.write_string(&a.uuid);
                    w.write_i32(a.short_uid as i32);
                }
            }
        }
        w.into_bytes()
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        match r.read_u8()? {
            CONTROL_START_GAME => {
                let count = r.read_i32()?;
                if count < 0 {
                    return Err(DecodeError::InvalidEnumValue { kind: "roster length", value: count });
                }
                let mut assignments = Vec::new();
                for _ in 0..count {
                    let uuid = r.read_string()?;
                    let raw = r.read_i32()?;
                    if raw <= 0 {
                        return Err(DecodeError::InvalidEnumValue { kind: "short uid", value: raw });
                    }
                    assignments.push(ShortUidAssignment { uuid, short_uid: raw as u32 });
                }
                Ok(ControlMessage::StartGame { assignments })
            }
            other => Err(DecodeError::UnknownTag(other)),
        }
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Authoritative transform of one owned body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySnapshot {
    /// Body in the shared map.
    pub handle: BodyHandle,
    /// Position.
    pub position: FixedVec2,
    /// Rotation.
    pub angle: Fixed,
    /// Linear velocity.
    pub linear_velocity: FixedVec2,
    /// Angular velocity.
    pub angular_velocity: Fixed,
}

/// Snapshots of every due body owned by one peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBatch {
    /// Owning peer UUID.
    pub owner: String,
    /// Owner's broadcast counter.
    pub sequence: u64,
    /// Body transforms.
    pub bodies: Vec<BodySnapshot>,
}

impl SnapshotBatch {
    /// Encode as a full snapshot packet.
    pub fn to_packet(&self) -> Result<Vec<u8>, bincode::Error> {
        let mut bytes = vec![PACKET_SNAPSHOT];
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }
}

// =============================================================================
// PACKETS
// =============================================================================

/// A decoded transport message.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Session control.
    Control(ControlMessage),
    /// Game event.
    Event(GameEvent),
    /// Ownership snapshot batch.
    Snapshot(SnapshotBatch),
}

/// Encode a game event as a full event packet.
pub fn event_packet(registry: &EventRegistry, event: &GameEvent) -> Result<Vec<u8>, RegistryError> {
    let body = registry.encode(event)?;
    let mut bytes = Vec::with_capacity(body.len() + 1);
    bytes.push(PACKET_EVENT);
    bytes.extend(body);
    Ok(bytes)
}

/// Decode any packet. Unknown event tags and malformed payloads are errors.
pub fn decode_packet(registry: &EventRegistry, bytes: &[u8]) -> Result<Packet, DecodeError> {
    let (&kind, rest) = bytes.split_first().ok_or(DecodeError::EmptyPacket)?;
    match kind {
        PACKET_CONTROL => {
            let mut r = WireReader::new(rest);
            let msg = ControlMessage::read(&mut r)?;
            r.finish()?;
            Ok(Packet::Control(msg))
        }
        PACKET_EVENT => registry.decode_tagged(rest).map(Packet::Event),
        PACKET_SNAPSHOT => bincode::deserialize(rest)
            .map(Packet::Snapshot)
            .map_err(|e| DecodeError::Snapshot(e.to_string())),
        other => Err(DecodeError::UnknownPacketKind(other)),
    }
}
