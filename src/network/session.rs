//! Peer Session
//!
//! Connection and role state machine for one peer, plus the inbound event
//! queue the fixed-step loop drains.
//!
//! ```text
//! Idle ─► Connecting ─► Connected ─► Handshake ─► InGame
//!   ▲                                                │
//!   └──────────────── disconnect() ◄─────────────────┘
//!            (NetError reachable from any state)
//! ```
//!
//! Events are queued in arrival order. Order is FIFO per sending peer, but
//! there is no total order across peers: two peers acting in the same
//! instant may see each other's events applied in different orders.

use std::collections::{BTreeSet, VecDeque};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::rng::derive_room_seed;
use crate::network::events::{GameEvent, WireEvent};
use crate::network::protocol::{
    decode_packet, event_packet, ControlMessage, Packet, ShortUidAssignment,
};
use crate::network::registry::{EventRegistry, RegistryError};
use crate::network::transport::{Transport, TransportError, TransportEvent};
use crate::physics::world::ObstacleWorld;
use crate::sync::ownership::{OwnershipConfig, OwnershipLedger};

/// Which side of the room this peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Opened the room; self-applies its own events.
    Host,
    /// Joined by room id.
    Client,
}

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not connected.
    Idle,
    /// Waiting for the transport.
    Connecting,
    /// In a room, game not started.
    Connected,
    /// Game started; waiting for the local short UID and readiness.
    Handshake,
    /// Playing.
    InGame,
    /// Transport failure. Caller must `disconnect()`.
    NetError,
}

impl SessionStatus {
    fn rank(self) -> u8 {
        match self {
            SessionStatus::Idle => 0,
            SessionStatus::Connecting => 1,
            SessionStatus::Connected => 2,
            SessionStatus::Handshake => 3,
            SessionStatus::InGame => 4,
            SessionStatus::NetError => 5,
        }
    }

    /// Connected to a room and able to exchange events.
    pub fn is_live(self) -> bool {
        matches!(self, SessionStatus::Connected | SessionStatus::Handshake | SessionStatus::InGame)
    }
}

/// Configuration for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum roster size to start.
    pub min_players: usize,
    /// Maximum roster size.
    pub max_players: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 6,
        }
    }
}

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation not allowed from the current status.
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },

    /// Host-only operation called on a client.
    #[error("only the host can do that")]
    NotHost,

    /// Too few peers to start.
    #[error("need {need} players, have {have}")]
    NotEnoughPlayers {
        /// Roster size.
        have: usize,
        /// Required size.
        need: usize,
    },

    /// `mark_ready` before a short UID was assigned.
    #[error("no short uid assigned")]
    NoShortUid,

    /// Event sent while not in a room.
    #[error("not connected")]
    NotConnected,

    /// Event kind not attached.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A decoded event and the peer it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Sending peer UUID (the local peer for host self-applied events).
    pub source: String,
    /// The event.
    pub event: GameEvent,
}

/// One peer's view of the room.
pub struct Session {
    config: SessionConfig,
    local_uuid: String,
    role: Option<Role>,
    status: SessionStatus,
    room_id: Option<String>,
    roster: BTreeSet<String>,
    host_uuid: Option<String>,
    short_uid: Option<u32>,
    registry: EventRegistry,
    transport: Box<dyn Transport>,
    inbound: VecDeque<InboundEvent>,
    ownership: OwnershipLedger,
    dropped_messages: u64,
}

impl Session {
    /// Create an idle session over `transport`. No event kinds are attached yet.
    pub fn new(
        transport: Box<dyn Transport>,
        config: SessionConfig,
        ownership: OwnershipConfig,
    ) -> Self {
        let local_uuid = transport.local_peer().to_string();
        Self {
            config,
            ownership: OwnershipLedger::new(local_uuid.clone(), ownership),
            local_uuid,
            role: None,
            status: SessionStatus::Idle,
            room_id: None,
            roster: BTreeSet::new(),
            host_uuid: None,
            short_uid: None,
            registry: EventRegistry::new(),
            transport,
            inbound: VecDeque::new(),
            dropped_messages: 0,
        }
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    fn advance(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if next.rank() <= self.status.rank() || self.status == SessionStatus::NetError {
            return Err(SessionError::InvalidTransition { from: self.status, to: next });
        }
        debug!("Session {:?} -> {:?}", self.status, next);
        self.status = next;
        Ok(())
    }

    fn fail(&mut self, reason: &str) {
        error!("Session {} network error: {}", self.local_uuid, reason);
        self.status = SessionStatus::NetError;
    }

    /// Open a new room as host.
    pub fn connect_as_host(&mut self) -> Result<(), SessionError> {
        self.advance(SessionStatus::Connecting)?;
        self.role = Some(Role::Host);
        self.roster.insert(self.local_uuid.clone());
        self.host_uuid = Some(self.local_uuid.clone());
        if let Err(e) = self.transport.open_room() {
            self.fail(&e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    /// Join `room_id` as client.
    pub fn connect_as_client(&mut self, room_id: &str) -> Result<(), SessionError> {
        self.advance(SessionStatus::Connecting)?;
        self.role = Some(Role::Client);
        if let Err(e) = self.transport.join_room(room_id) {
            self.fail(&e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    /// Leave the room and return to `Idle`.
    ///
    /// Further inbound traffic is ignored, the inbound queue is flushed and
    /// every ownership claim is released without notifying peers.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.inbound.clear();
        let released = self.ownership.release_all();
        self.ownership.disable_physics();
        info!(
            "Session {} disconnected from {:?} ({} claims released)",
            self.local_uuid, self.room_id, released
        );
        self.status = SessionStatus::Idle;
        self.role = None;
        self.room_id = None;
        self.roster.clear();
        self.host_uuid = None;
        self.short_uid = None;
    }

    /// Host: start the game, assigning short UIDs to the roster.
    pub fn start_game(&mut self) -> Result<(), SessionError> {
        if self.role != Some(Role::Host) {
            return Err(SessionError::NotHost);
        }
        if self.status != SessionStatus::Connected {
            return Err(SessionError::InvalidTransition { from: self.status, to: SessionStatus::Handshake });
        }
        let have = self.roster.len();
        if have < self.config.min_players {
            return Err(SessionError::NotEnoughPlayers { have, need: self.config.min_players });
        }

        let assignments: Vec<ShortUidAssignment> = self.roster
            .iter()
            .enumerate()
            .map(|(i, uuid)| ShortUidAssignment { uuid: uuid.clone(), short_uid: i as u32 + 1 })
            .collect();
        let msg = ControlMessage::StartGame { assignments: assignments.clone() };
        if let Err(e) = self.transport.broadcast(msg.to_packet()) {
            self.fail(&e.to_string());
            return Err(e.into());
        }
        let host = self.local_uuid.clone();
        self.apply_assignments(&host, &assignments);
        Ok(())
    }

    fn apply_assignments(&mut self, host: &str, assignments: &[ShortUidAssignment]) {
        if self.status != SessionStatus::Connected {
            warn!("Ignoring start-game in status {:?}", self.status);
            return;
        }
        self.host_uuid = Some(host.to_string());
        self.roster = assignments.iter().map(|a| a.uuid.clone()).collect();
        self.short_uid = assignments
            .iter()
            .find(|a| a.uuid == self.local_uuid)
            .map(|a| a.short_uid);
        self.status = SessionStatus::Handshake;
        info!("Session {} in handshake, short uid {:?}", self.local_uuid, self.short_uid);
    }

    /// Enter `InGame` once a short UID is known.
    pub fn mark_ready(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Handshake {
            return Err(SessionError::InvalidTransition { from: self.status, to: SessionStatus::InGame });
        }
        if self.short_uid.is_none() {
            return Err(SessionError::NoShortUid);
        }
        self.advance(SessionStatus::InGame)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Current status.
    pub fn get_status(&self) -> SessionStatus {
        self.status
    }

    /// Peers in the room, including this one.
    pub fn get_num_players(&self) -> usize {
        self.roster.len()
    }

    /// Roster sorted lexicographically. Identical on every peer with the same roster.
    pub fn get_ordered_players(&self) -> Vec<String> {
        self.roster.iter().cloned().collect()
    }

    /// The roster member designated by `seed` (`roster[seed % n]`).
    pub fn role_holder(&self, seed: u64) -> Option<String> {
        let n = self.roster.len() as u64;
        if n == 0 {
            return None;
        }
        self.roster.iter().nth((seed % n) as usize).cloned()
    }

    /// Seed every peer derives from the room id.
    pub fn room_seed(&self) -> u64 {
        derive_room_seed(self.room_id.as_deref().unwrap_or(""))
    }

    /// This peer's UUID.
    pub fn local_uuid(&self) -> &str {
        &self.local_uuid
    }

    /// Host or client, once connecting.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Whether this peer is the host.
    pub fn is_host(&self) -> bool {
        self.role == Some(Role::Host)
    }

    /// UUID of the peer that started the game (this peer, when hosting).
    pub fn host_uuid(&self) -> Option<&str> {
        self.host_uuid.as_deref()
    }

    /// Room id, once assigned.
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Short UID, once the game has started.
    pub fn short_uid(&self) -> Option<u32> {
        self.short_uid
    }

    /// Messages dropped because they failed to decode.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages
    }

    /// Ownership ledger for this peer.
    pub fn ownership(&self) -> &OwnershipLedger {
        &self.ownership
    }

    /// Mutable ownership ledger.
    pub fn ownership_mut(&mut self) -> &mut OwnershipLedger {
        &mut self.ownership
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Register event kind `T` for sending and receiving.
    pub fn attach_event_type<T: WireEvent>(&mut self) {
        self.registry.attach_event_type::<T>();
    }

    /// Register every game event kind.
    pub fn attach_game_events(&mut self) {
        self.registry.attach_game_events();
    }

    /// Broadcast an event. The host also queues it for itself.
    pub fn push_out_event(&mut self, event: GameEvent) -> Result<(), SessionError> {
        if !self.status.is_live() {
            return Err(SessionError::NotConnected);
        }
        let packet = event_packet(&self.registry, &event)?;
        if let Err(e) = self.transport.broadcast(packet) {
            self.fail(&e.to_string());
            return Err(e.into());
        }
        if self.is_host() {
            self.inbound.push_back(InboundEvent { source: self.local_uuid.clone(), event });
        }
        Ok(())
    }

    /// Whether an inbound event is waiting.
    pub fn is_in_available(&self) -> bool {
        !self.inbound.is_empty()
    }

    /// Oldest inbound event.
    pub fn pop_in_event(&mut self) -> Option<InboundEvent> {
        self.inbound.pop_front()
    }

    /// Discard every queued inbound event. Returns how many were dropped.
    pub fn flush_inbound(&mut self) -> usize {
        let count = self.inbound.len();
        self.inbound.clear();
        count
    }

    /// Drain the transport without blocking, decoding into the inbound queues.
    pub fn update_net(&mut self) {
        if self.status == SessionStatus::Idle {
            return;
        }
        while let Some(event) = self.transport.poll_event() {
            self.handle_transport_event(event);
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::RoomAssigned(room_id) => {
                if self.status != SessionStatus::Connecting || !self.is_host() {
                    warn!("Unexpected room assignment {}", room_id);
                    return;
                }
                info!("Hosting room {}", room_id);
                self.room_id = Some(room_id);
                self.status = SessionStatus::Connected;
            }
            TransportEvent::Joined { room_id, peers } => {
                if self.status != SessionStatus::Connecting {
                    warn!("Unexpected join confirmation for {}", room_id);
                    return;
                }
                info!("Joined room {} with {} peers", room_id, peers.len());
                self.room_id = Some(room_id);
                self.roster.extend(peers);
                self.roster.insert(self.local_uuid.clone());
                self.status = SessionStatus::Connected;
            }
            TransportEvent::PeerJoined(peer) => {
                if self.status != SessionStatus::Connected {
                    warn!("Peer {} joined after game start; ignoring", peer);
                    return;
                }
                if self.roster.len() >= self.config.max_players {
                    warn!("Roster full; ignoring peer {}", peer);
                    return;
                }
                info!("Peer {} joined", peer);
                self.roster.insert(peer);
            }
            TransportEvent::PeerLeft(peer) => {
                // Its bodies stay frozen: no ownership takeover.
                warn!("Peer {} left", peer);
                self.roster.remove(&peer);
            }
            TransportEvent::Message { source, bytes } => self.handle_message(source, &bytes),
            TransportEvent::Error(reason) => self.fail(&reason),
        }
    }

    fn handle_message(&mut self, source: String, bytes: &[u8]) {
        match decode_packet(&self.registry, bytes) {
            Ok(Packet::Event(event)) => {
                self.inbound.push_back(InboundEvent { source, event });
            }
            Ok(Packet::Snapshot(batch)) => {
                if batch.owner != source {
                    warn!("Snapshot from {} claims owner {}; dropping", source, batch.owner);
                    self.dropped_messages += 1;
                    return;
                }
                self.ownership.queue_snapshot(batch);
            }
            Ok(Packet::Control(ControlMessage::StartGame { assignments })) => {
                self.apply_assignments(&source, &assignments);
            }
            Err(e) => {
                self.dropped_messages += 1;
                warn!("Dropping message from {}: {}", source, e);
            }
        }
    }

    // =========================================================================
    // PHYSICS
    // =========================================================================

    /// Copy received snapshots onto mirrored bodies. Returns bodies updated.
    pub fn apply_snapshots(&mut self, world: &mut ObstacleWorld) -> usize {
        self.ownership.apply_pending(world)
    }

    /// Broadcast owned bodies whose snapshot is due.
    pub fn broadcast_snapshots(&mut self, world: &ObstacleWorld) {
        let Some(batch) = self.ownership.collect_due(world) else {
            return;
        };
        if !self.status.is_live() {
            return;
        }
        match batch.to_packet() {
            Ok(packet) => {
                if let Err(e) = self.transport.broadcast(packet) {
                    self.fail(&e.to_string());
                }
            }
            Err(e) => warn!("Failed to encode snapshot batch: {}", e),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("local_uuid", &self.local_uuid)
            .field("role", &self.role)
            .field("status", &self.status)
            .field("room_id", &self.room_id)
            .field("roster", &self.roster)
            .field("inbound", &self.inbound.len())
            .finish()
    }
}
