//! Ownership Ledger
//!
//! Tracks which peer is authoritative for each physics body. The owner
//! integrates the body and periodically broadcasts its transform; every
//! other peer copies the received transform onto its mirror and does not
//! integrate it.
//!
//! Ownership never migrates. When an owner leaves, its bodies stay frozen
//! at their last snapshot until the world is rebuilt.

use std::collections::{BTreeMap, VecDeque};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::network::protocol::{BodySnapshot, SnapshotBatch};
use crate::physics::world::{BodyHandle, ObstacleWorld};

/// Ownership settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// Fixed steps between snapshots of an owned body.
    pub snapshot_cadence_ticks: u32,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            snapshot_cadence_ticks: 3,
        }
    }
}

/// Ownership failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    /// Body already has an owner.
    #[error("body {handle:?} is already owned by {owner}")]
    AlreadyOwned {
        /// Contested body.
        handle: BodyHandle,
        /// Current owner.
        owner: String,
    },

    /// Release of a body this peer does not own.
    #[error("body {0:?} is not owned by this peer")]
    NotOwner(BodyHandle),

    /// Claim attempted while synchronization is off.
    #[error("physics synchronization is disabled")]
    PhysicsDisabled,
}

/// A body claimed by the local peer.
#[derive(Debug, Clone)]
pub struct OwnedObstacle {
    /// Body handle.
    pub handle: BodyHandle,
    /// Owner (always the local peer).
    pub owner: String,
    /// Higher priority bodies are listed first in a batch.
    pub priority: u32,
    /// Fixed steps since this body was last broadcast.
    pub ticks_since_broadcast: u32,
}

/// Per-peer ownership table and snapshot buffers.
#[derive(Debug)]
pub struct OwnershipLedger {
    local: String,
    config: OwnershipConfig,
    enabled: bool,
    owned: BTreeMap<BodyHandle, OwnedObstacle>,
    remote_owners: BTreeMap<BodyHandle, String>,
    pending: VecDeque<SnapshotBatch>,
    sequence: u64,
}

impl OwnershipLedger {
    /// Ledger for `local_peer`, initially disabled.
    pub fn new(local_peer: impl Into<String>, config: OwnershipConfig) -> Self {
        Self {
            local: local_peer.into(),
            config,
            enabled: false,
            owned: BTreeMap::new(),
            remote_owners: BTreeMap::new(),
            pending: VecDeque::new(),
            sequence: 0,
        }
    }

    /// Start synchronizing.
    pub fn enable_physics(&mut self) {
        if !self.enabled {
            info!("Physics sync enabled for {}", self.local);
        }
        self.enabled = true;
    }

    /// Stop synchronizing: release every claim and drop buffered snapshots.
    pub fn disable_physics(&mut self) {
        if self.enabled {
            info!("Physics sync disabled for {}", self.local);
        }
        self.enabled = false;
        self.owned.clear();
        self.remote_owners.clear();
        self.pending.clear();
    }

    /// Whether synchronization is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Claim `handle` for the local peer.
    ///
    /// A body that already has an owner (local, or a remote peer seen in a
    /// snapshot) is rejected and the existing owner stays authoritative.
    pub fn acquire_obs(&mut self, handle: BodyHandle, priority: u32) -> Result<(), OwnershipError> {
        if !self.enabled {
            return Err(OwnershipError::PhysicsDisabled);
        }
        if let Some(existing) = self.owned.get(&handle) {
            return Err(OwnershipError::AlreadyOwned { handle, owner: existing.owner.clone() });
        }
        if let Some(owner) = self.remote_owners.get(&handle) {
            return Err(OwnershipError::AlreadyOwned { handle, owner: owner.clone() });
        }

        self.owned.insert(handle, OwnedObstacle {
            handle,
            owner: self.local.clone(),
            priority,
            // Broadcast on the first eligible step.
            ticks_since_broadcast: self.config.snapshot_cadence_ticks,
        });
        Ok(())
    }

    /// Record that `owner` is authoritative for `handle` before any of its
    /// snapshots arrive, so the local step leaves the mirror alone.
    ///
    /// Ignored for bodies the local peer owns and while sync is off.
    pub fn expect_remote(&mut self, handle: BodyHandle, owner: impl Into<String>) {
        let owner = owner.into();
        if !self.enabled || owner == self.local || self.owned.contains_key(&handle) {
            return;
        }
        self.remote_owners.insert(handle, owner);
    }

    /// Give up a claim.
    pub fn release_obs(&mut self, handle: BodyHandle) -> Result<(), OwnershipError> {
        self.owned.remove(&handle).map(|_| ()).ok_or(OwnershipError::NotOwner(handle))
    }

    /// Give up every claim without telling anyone. Returns how many were held.
    pub fn release_all(&mut self) -> usize {
        let count = self.owned.len();
        self.owned.clear();
        count
    }

    /// Whether the local peer owns `handle`.
    pub fn owns(&self, handle: BodyHandle) -> bool {
        self.owned.contains_key(&handle)
    }

    /// Known owner of `handle`, local or remote.
    pub fn owner_of(&self, handle: BodyHandle) -> Option<&str> {
        self.owned
            .get(&handle)
            .map(|o| o.owner.as_str())
            .or_else(|| self.remote_owners.get(&handle).map(String::as_str))
    }

    /// Number of locally owned bodies.
    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    /// Whether the local physics step should integrate `handle`.
    ///
    /// False only for bodies a remote peer is known to own while sync is on.
    pub fn integrates(&self, handle: BodyHandle) -> bool {
        !self.enabled || self.owned.contains_key(&handle) || !self.remote_owners.contains_key(&handle)
    }

    /// Buffer a received batch until the next fixed step.
    pub fn queue_snapshot(&mut self, batch: SnapshotBatch) {
        if !self.enabled {
            debug!("Dropping snapshot from {}: physics sync disabled", batch.owner);
            return;
        }
        if batch.owner == self.local {
            return;
        }
        self.pending.push_back(batch);
    }

    /// Snapshots waiting to be applied.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Copy buffered transforms onto mirrored bodies. Returns bodies updated.
    pub fn apply_pending(&mut self, world: &mut ObstacleWorld) -> usize {
        let mut applied = 0;
        while let Some(batch) = self.pending.pop_front() {
            for snap in &batch.bodies {
                if self.owned.contains_key(&snap.handle) {
                    warn!(
                        "Ignoring snapshot of {:?} from {}: owned locally",
                        snap.handle, batch.owner
                    );
                    continue;
                }
                let Some(body) = world.body_mut(snap.handle) else {
                    debug!("Snapshot for unknown body {:?} from {}", snap.handle, batch.owner);
                    continue;
                };
                body.position = snap.position;
                body.angle = snap.angle;
                body.linear_velocity = snap.linear_velocity;
                body.angular_velocity = snap.angular_velocity;
                self.remote_owners.insert(snap.handle, batch.owner.clone());
                applied += 1;
            }
        }
        applied
    }

    /// Advance one fixed step and collect the owned bodies that are due.
    pub fn collect_due(&mut self, world: &ObstacleWorld) -> Option<SnapshotBatch> {
        if !self.enabled || self.owned.is_empty() {
            return None;
        }

        let cadence = self.config.snapshot_cadence_ticks.max(1);
        let mut due: Vec<(u32, BodySnapshot)> = Vec::new();
        for owned in self.owned.values_mut() {
            owned.ticks_since_broadcast += 1;
            if owned.ticks_since_broadcast < cadence {
                continue;
            }
            if let Some(body) = world.body(owned.handle) {
                owned.ticks_since_broadcast = 0;
                due.push((owned.priority, BodySnapshot {
                    handle: owned.handle,
                    position: body.position,
                    angle: body.angle,
                    linear_velocity: body.linear_velocity,
                    angular_velocity: body.angular_velocity,
                }));
            }
        }
        if due.is_empty() {
            return None;
        }

        // Stable: equal priorities keep handle order.
        due.sort_by(|a, b| b.0.cmp(&a.0));
        self.sequence += 1;
        Some(SnapshotBatch {
            owner: self.local.clone(),
            sequence: self.sequence,
            bodies: due.into_iter().map(|(_, s)| s).collect(),
        })
    }
}
