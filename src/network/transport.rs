//! Transport Contract
//!
//! The session only needs room-code rendezvous and ordered per-peer byte
//! delivery. Transports hand events to the session over a tokio unbounded
//! channel; [`Transport::poll_event`] never blocks, so it is safe to call
//! from the fixed-step loop while the transport's own I/O runs elsewhere.
//!
//! [`LoopbackHub`] is an in-process implementation used by tests and the
//! demo binary. The hub is `Clone + Send + Sync`, so peers may live on
//! different threads.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Host: a room id was allocated.
    RoomAssigned(String),
    /// Client: joined a room that already holds `peers`.
    Joined {
        /// Room id.
        room_id: String,
        /// Peers already present.
        peers: Vec<String>,
    },
    /// Another peer entered the room.
    PeerJoined(String),
    /// Another peer left the room.
    PeerLeft(String),
    /// Opaque bytes from another peer.
    Message {
        /// Sending peer UUID.
        source: String,
        /// Payload.
        bytes: Vec<u8>,
    },
    /// Fatal transport failure.
    Error(String),
}

/// Transport failures surfaced synchronously.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No room with that id.
    #[error("room {0} not found")]
    RoomNotFound(String),
    /// Room at capacity.
    #[error("room {0} is full")]
    RoomFull(String),
    /// Already connected to a room.
    #[error("already in a room")]
    AlreadyInRoom,
    /// Not connected to any room.
    #[error("not in a room")]
    NotInRoom,
    /// Shared state unavailable (lock poisoned).
    #[error("transport hub unavailable")]
    HubUnavailable,
}

/// Room rendezvous plus message delivery.
pub trait Transport: Send {
    /// UUID of this peer.
    fn local_peer(&self) -> &str;

    /// Ask for a new room; completion arrives as [`TransportEvent::RoomAssigned`].
    fn open_room(&mut self) -> Result<(), TransportError>;

    /// Join an existing room; completion arrives as [`TransportEvent::Joined`].
    fn join_room(&mut self, room_id: &str) -> Result<(), TransportError>;

    /// Send bytes to every other peer in the room.
    fn broadcast(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Leave the room. Nothing is delivered afterwards.
    fn close(&mut self);

    /// Next pending event, if any. Never blocks.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

// =============================================================================
// LOOPBACK
// =============================================================================

struct Room {
    members: BTreeMap<String, mpsc::UnboundedSender<TransportEvent>>,
}

#[derive(Default)]
struct HubState {
    next_room: u32,
    rooms: BTreeMap<String, Room>,
}

/// In-process rendezvous point shared by loopback transports.
#[derive(Clone)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubState>>,
    max_peers: usize,
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new(8)
    }
}

impl LoopbackHub {
    /// Hub whose rooms hold at most `max_peers`.
    pub fn new(max_peers: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubState::default())),
            max_peers,
        }
    }

    /// Create a transport for a peer with a random UUID.
    pub fn connect(&self) -> LoopbackTransport {
        self.connect_as(uuid::Uuid::new_v4().to_string())
    }

    /// Create a transport for a peer with a fixed UUID.
    pub fn connect_as(&self, peer: impl Into<String>) -> LoopbackTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        LoopbackTransport {
            hub: self.clone(),
            peer: peer.into(),
            tx,
            rx,
            room: None,
        }
    }

    /// Number of open rooms.
    pub fn room_count(&self) -> usize {
        self.inner.lock().map(|s| s.rooms.len()).unwrap_or(0)
    }
}

/// One peer's endpoint on a [`LoopbackHub`].
pub struct LoopbackTransport {
    hub: LoopbackHub,
    peer: String,
    tx: mpsc::UnboundedSender<TransportEvent>,
    rx: mpsc::UnboundedReceiver<TransportEvent>,
    room: Option<String>,
}

impl LoopbackTransport {
    /// Room currently joined.
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }
}

impl Transport for LoopbackTransport {
    fn local_peer(&self) -> &str {
        &self.peer
    }

    fn open_room(&mut self) -> Result<(), TransportError> {
        if self.room.is_some() {
            return Err(TransportError::AlreadyInRoom);
        }
        let mut state = self.hub.inner.lock().map_err(|_| TransportError::HubUnavailable)?;
        state.next_room += 1;
        let room_id = format!("{:05}", state.next_room);

        let mut members = BTreeMap::new();
        members.insert(self.peer.clone(), self.tx.clone());
        state.rooms.insert(room_id.clone(), Room { members });

        info!("Loopback room {} opened by {}", room_id, self.peer);
        self.room = Some(room_id.clone());
        let _ = self.tx.send(TransportEvent::RoomAssigned(room_id));
        Ok(())
    }

    fn join_room(&mut self, room_id: &str) -> Result<(), TransportError> {
        if self.room.is_some() {
            return Err(TransportError::AlreadyInRoom);
        }
        let mut state = self.hub.inner.lock().map_err(|_| TransportError::HubUnavailable)?;
        let max_peers = self.hub.max_peers;
        let room = state.rooms
            .get_mut(room_id)
            .ok_or_else(|| TransportError::RoomNotFound(room_id.to_string()))?;
        if room.members.len() >= max_peers {
            return Err(TransportError::RoomFull(room_id.to_string()));
        }

        let peers: Vec<String> = room.members.keys().cloned().collect();
        for sender in room.members.values() {
            let _ = sender.send(TransportEvent::PeerJoined(self.peer.clone()));
        }
        room.members.insert(self.peer.clone(), self.tx.clone());

        info!("Peer {} joined loopback room {}", self.peer, room_id);
        self.room = Some(room_id.to_string());
        let _ = self.tx.send(TransportEvent::Joined { room_id: room_id.to_string(), peers });
        Ok(())
    }

    fn broadcast(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let room_id = self.room.as_ref().ok_or(TransportError::NotInRoom)?;
        let state = self.hub.inner.lock().map_err(|_| TransportError::HubUnavailable)?;
        let room = state.rooms.get(room_id).ok_or_else(|| TransportError::RoomNotFound(room_id.clone()))?;
        for (peer, sender) in &room.members {
            if *peer == self.peer {
                continue;
            }
            if sender.send(TransportEvent::Message { source: self.peer.clone(), bytes: bytes.clone() }).is_err() {
                debug!("Dropped message to departed peer {}", peer);
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(room_id) = self.room.take() {
            if let Ok(mut state) = self.hub.inner.lock() {
                let now_empty = match state.rooms.get_mut(&room_id) {
                    Some(room) => {
                        room.members.remove(&self.peer);
                        for sender in room.members.values() {
                            let _ = sender.send(TransportEvent::PeerLeft(self.peer.clone()));
                        }
                        room.members.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    state.rooms.remove(&room_id);
                }
            } else {
                warn!("Loopback hub unavailable while closing {}", self.peer);
            }
            info!("Peer {} left loopback room {}", self.peer, room_id);
        }
        // Anything already queued is discarded.
        while self.rx.try_recv().is_ok() {}
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.rx.try_recv().ok()
    }
}
