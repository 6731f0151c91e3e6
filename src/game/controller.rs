//! Game Controller
//!
//! Drives one peer's copy of the game through the three loop phases:
//!
//! ```text
//! pre_update    sample input → move local avatar → emit events
//!               (host) steer baby carrots
//! fixed_update  update_net → reduce inbound FIFO → apply snapshots
//!               → age rocks → step physics → contacts → emit events
//!               → broadcast snapshots
//! post_update   garbage collect → timers → win check → countdown → Reset
//! ```
//!
//! Emitting an event sends it to every peer and, for most kinds, applies it
//! to the local world straight away.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::core::fixed::{
    duration_to_fixed, Fixed, AVATAR_RADIUS, CARROT_SPEED, DASH_MULTIPLIER, FARMER_SPEED,
    FIXED_ONE, ROCK_RADIUS, ROCK_THROW_SPEED,
};
use crate::core::rng::derive_round_seed;
use crate::core::vec2::FixedVec2;
use crate::game::collision::contacts_to_events;
use crate::game::entity::EntityState;
use crate::game::input::{InputFrame, InputSource};
use crate::game::map::{generate, GameConfig};
use crate::game::reducer::{apply_event, ReduceContext, ReduceOutcome, ReducerOptions};
use crate::game::services::{Cue, Services};
use crate::game::state::SharedWorld;
use crate::game::tick::LoopPhases;
use crate::game::wander::BabyWander;
use crate::network::events::{
    DashEvent, FreeEvent, GameEvent, MoveEvent, ReadyEvent, ResetEvent, ResetKind, RootEvent,
    RustleEvent, SpawnRockEvent, UnrootEvent,
};
use crate::network::session::{InboundEvent, Session, SessionError, SessionStatus};
use crate::physics::world::BodyHandle;

/// Rendered frames a dash lasts.
pub const DASH_FRAMES: u32 = 12;

/// Snapshot priority of the local avatar.
const AVATAR_PRIORITY: u32 = 10;
/// Snapshot priority of shared bodies.
const SHARED_PRIORITY: u32 = 1;

/// Controller failures.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The session has not reached `InGame`.
    #[error("session is {0:?}, not in game")]
    NotInGame(SessionStatus),

    /// Nobody to assign roles to.
    #[error("roster is empty")]
    EmptyRoster,

    /// Session failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Who won a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundWinner {
    /// Every carrot was rooted.
    Farmer,
    /// Every baby carrot was collected.
    Carrots,
}

/// One peer's game.
pub struct GameController {
    session: Session,
    world: SharedWorld,
    wander: BabyWander,
    services: Services,
    input: Box<dyn InputSource>,
    game: GameConfig,
    reducer: ReducerOptions,
    playing: bool,
    round: u32,
    tick: u64,
    journal: Vec<InboundEvent>,
    ready: BTreeMap<ResetKind, BTreeSet<String>>,
    winner: Option<RoundWinner>,
    countdown: u32,
    reset_requested: bool,
    facing: FixedVec2,
    dash_frames: u32,
    rustling: bool,
}

impl GameController {
    /// Controller over `session`. The session should have its event kinds attached.
    pub fn new(session: Session, input: Box<dyn InputSource>, services: Services, config: &SyncConfig) -> Self {
        Self {
            session,
            world: SharedWorld::default(),
            wander: BabyWander::new(0),
            services,
            input,
            game: config.game.clone(),
            reducer: config.reducer.clone(),
            playing: false,
            round: 0,
            tick: 0,
            journal: Vec::new(),
            ready: BTreeMap::new(),
            winner: None,
            countdown: 0,
            reset_requested: false,
            facing: FixedVec2::new(FIXED_ONE, 0),
            dash_frames: 0,
            rustling: false,
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Build the first round. The session must be `InGame`.
    pub fn begin_match(&mut self) -> Result<(), ControllerError> {
        let status = self.session.get_status();
        if status != SessionStatus::InGame {
            return Err(ControllerError::NotInGame(status));
        }
        self.round = 0;
        self.start_round(BTreeMap::new())
    }

    fn start_round(&mut self, points: BTreeMap<String, u32>) -> Result<(), ControllerError> {
        let roster = self.session.get_ordered_players();
        let seed = derive_round_seed(self.session.room_seed(), self.round);
        let farmer = self.session.role_holder(seed).ok_or(ControllerError::EmptyRoster)?;

        self.world = generate(&self.game, &roster, &farmer, seed, self.round);
        self.world.points = points;
        self.wander = BabyWander::new(seed);
        self.winner = None;
        self.countdown = 0;
        self.reset_requested = false;
        self.dash_frames = 0;
        self.rustling = false;

        let local = self.session.local_uuid().to_string();
        let shared = self.world.shared_bodies();
        let avatar = self.world.avatar_body(&local);
        let host = self.session.host_uuid().map(str::to_string);
        let is_host = self.session.is_host();

        // Everything this peer does not claim already has a known owner.
        let mut remote: Vec<(BodyHandle, String)> = roster
            .iter()
            .filter(|peer| **peer != local)
            .filter_map(|peer| self.world.avatar_body(peer).map(|h| (h, peer.clone())))
            .collect();
        if !is_host {
            match &host {
                Some(host) => remote.extend(shared.iter().map(|h| (*h, host.clone()))),
                None => warn!("Host unknown; shared bodies integrate locally until its first snapshot"),
            }
        }

        let ledger = self.session.ownership_mut();
        ledger.disable_physics();
        ledger.enable_physics();
        if is_host {
            for handle in shared {
                if let Err(e) = ledger.acquire_obs(handle, SHARED_PRIORITY) {
                    warn!("Could not claim {:?}: {}", handle, e);
                }
            }
        }
        if let Some(handle) = avatar {
            if let Err(e) = ledger.acquire_obs(handle, AVATAR_PRIORITY) {
                warn!("Could not claim own avatar: {}", e);
            }
        }
        for (handle, owner) in remote {
            ledger.expect_remote(handle, owner);
        }

        self.playing = true;
        info!(
            "Peer {} starting round {} as {}",
            local,
            self.round,
            if farmer == local { "farmer" } else { "carrot" }
        );
        Ok(())
    }

    fn reset(&mut self, kind: ResetKind) {
        let dropped = self.session.flush_inbound();
        if dropped > 0 {
            debug!("Reset discarded {} queued events", dropped);
        }
        let mut points = std::mem::take(&mut self.world.points);
        if kind == ResetKind::Game {
            points.clear();
        }
        self.ready.clear();
        self.round += 1;
        if let Err(e) = self.start_round(points) {
            warn!("Reset failed: {}", e);
            self.playing = false;
        }
    }

    /// Tell every peer this one is ready for a reset of `kind`.
    pub fn request_reset(&mut self, kind: ResetKind) -> Result<(), ControllerError> {
        if !self.playing {
            return Err(ControllerError::NotInGame(self.session.get_status()));
        }
        self.session.push_out_event(ReadyEvent { kind }.into())?;
        Ok(())
    }

    /// Leave the room and stop playing.
    pub fn disconnect(&mut self) {
        self.session.disconnect();
        self.playing = false;
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The peer session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable peer session.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// This peer's copy of the shared world.
    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    /// Mutable shared world.
    pub fn world_mut(&mut self) -> &mut SharedWorld {
        &mut self.world
    }

    /// Whether a round is running.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current round number.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Fixed steps run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Events reduced during the last fixed update, in order.
    pub fn journal(&self) -> &[InboundEvent] {
        &self.journal
    }

    /// Winner of the current round, once decided.
    pub fn winner(&self) -> Option<RoundWinner> {
        self.winner
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Send `event` and apply it locally when it is an optimistic kind.
    pub fn emit(&mut self, event: GameEvent) {
        if let Err(e) = self.session.push_out_event(event.clone()) {
            warn!("Failed to send {}: {}", event.name(), e);
            return;
        }
        if self.reducer.optimistic_local_apply && event.applies_optimistically() {
            let direct = ReducerOptions { filter_self_echo: false, ..self.reducer.clone() };
            let local = self.session.local_uuid();
            let mut ctx = ReduceContext { local_uuid: local, options: &direct, services: &mut self.services };
            apply_event(&mut self.world, local, &event, &mut ctx);
        }
    }

    fn drain_inbound(&mut self) {
        self.journal.clear();
        while let Some(inbound) = self.session.pop_in_event() {
            let outcome = {
                let mut ctx = ReduceContext {
                    local_uuid: self.session.local_uuid(),
                    options: &self.reducer,
                    services: &mut self.services,
                };
                apply_event(&mut self.world, &inbound.source, &inbound.event, &mut ctx)
            };
            let source = inbound.source.clone();
            self.journal.push(inbound);
            match outcome {
                ReduceOutcome::Reset(kind) => {
                    self.reset(kind);
                    break;
                }
                ReduceOutcome::Ready(kind) => self.record_ready(kind, source),
                ReduceOutcome::Applied | ReduceOutcome::Skipped(_) => {}
            }
        }
    }

    fn record_ready(&mut self, kind: ResetKind, peer: String) {
        let ready = self.ready.entry(kind).or_default();
        ready.insert(peer);
        if !self.session.is_host() {
            return;
        }
        let roster = self.session.get_ordered_players();
        if roster.iter().all(|p| ready.contains(p)) {
            self.ready.remove(&kind);
            info!("All peers ready; resetting ({:?})", kind);
            if let Err(e) = self.session.push_out_event(ResetEvent { kind }.into()) {
                warn!("Failed to send reset: {}", e);
            }
        }
    }

    // =========================================================================
    // LOCAL INPUT
    // =========================================================================

    fn steer(&mut self, local: &str, body: BodyHandle, speed: Fixed, frame: &InputFrame, out: &mut Vec<GameEvent>) {
        if self.dash_frames > 0 {
            self.dash_frames -= 1;
        } else if frame.pressed(InputFrame::FLAG_DASH) {
            self.dash_frames = DASH_FRAMES;
            out.push(DashEvent { uuid: local.to_string() }.into());
        }

        let dir = if frame.has_movement() {
            frame.move_direction()
        } else if self.dash_frames > 0 {
            self.facing
        } else {
            FixedVec2::ZERO
        };
        let mut velocity = dir.scale(speed);
        if self.dash_frames > 0 {
            velocity = velocity.scale(DASH_MULTIPLIER);
        }
        self.world.physics.set_velocity(body, velocity);
    }

    fn set_local_state(&mut self, local: &str, state: EntityState, out: &mut Vec<GameEvent>) {
        let current = if self.world.is_farmer(local) {
            self.world.farmer_mut(local).map(|f| &mut f.state)
        } else {
            self.world.carrot_mut(local).map(|c| &mut c.state)
        };
        let Some(current) = current else {
            return;
        };
        if *current == state {
            return;
        }
        *current = state;
        // Dashing travels as its own event.
        if state != EntityState::Dashing {
            out.push(MoveEvent { uuid: local.to_string(), state }.into());
        }
    }

    fn throw_rock(&self, local: &str, body: BodyHandle, rock_from: Option<i32>) -> Option<GameEvent> {
        let at = self.world.physics.position(body)?;
        let dir = self.facing.normalize();
        let pos = at + dir.scale(AVATAR_RADIUS + 2 * ROCK_RADIUS);
        Some(SpawnRockEvent {
            pos,
            idx: rock_from.unwrap_or(-1),
            vel: dir.scale(ROCK_THROW_SPEED),
            uuid: local.to_string(),
        }.into())
    }

    fn drive_farmer(&mut self, local: &str, frame: &InputFrame, out: &mut Vec<GameEvent>) {
        let Some(farmer) = self.world.farmer(local).cloned() else {
            return;
        };
        if farmer.stun_frames > 0 {
            self.world.physics.set_velocity(farmer.body, FixedVec2::ZERO);
            self.set_local_state(local, EntityState::Stunned, out);
            return;
        }
        self.steer(local, farmer.body, FARMER_SPEED, frame, out);

        if frame.pressed(InputFrame::FLAG_ROOT) {
            let spot = self.world.physics.position(farmer.body).and_then(|p| self.world.free_spot_at(p));
            if let (Some(carrot), Some(spot)) = (farmer.held_carrot.clone(), spot) {
                out.push(RootEvent { uuid: carrot, planting_spot_id: spot }.into());
            }
        }
        if frame.pressed(InputFrame::FLAG_THROW) && farmer.has_rock {
            out.extend(self.throw_rock(local, farmer.body, farmer.rock_from));
        }

        let state = if self.dash_frames > 0 {
            EntityState::Dashing
        } else if farmer.holding_carrot {
            EntityState::Carrying
        } else if frame.has_movement() {
            EntityState::Walking
        } else {
            EntityState::Standing
        };
        self.set_local_state(local, state, out);
    }

    fn drive_carrot(&mut self, local: &str, frame: &InputFrame, out: &mut Vec<GameEvent>) {
        let Some(carrot) = self.world.carrot(local).cloned() else {
            return;
        };

        if carrot.captured {
            // Held carrots ride along with the farmer.
            let at = self.world.farmer.as_ref().and_then(|f| self.world.physics.position(f.body));
            if let Some(at) = at {
                self.world.physics.place(carrot.body, at);
            }
            if frame.pressed(InputFrame::FLAG_SHAKE) {
                let shakes = carrot.shakes + 1;
                if let Some(c) = self.world.carrot_mut(local) {
                    c.shakes = shakes;
                }
                if shakes >= self.game.free_shakes {
                    out.push(FreeEvent { uuid: local.to_string() }.into());
                }
            }
            return;
        }
        if carrot.rooted {
            return;
        }
        if carrot.stun_frames > 0 {
            self.world.physics.set_velocity(carrot.body, FixedVec2::ZERO);
            self.set_local_state(local, EntityState::Stunned, out);
            return;
        }
        self.steer(local, carrot.body, CARROT_SPEED, frame, out);

        if frame.pressed(InputFrame::FLAG_UNROOT) {
            let target = self.world.physics.position(carrot.body).and_then(|p| self.world.rooted_carrot_at(p));
            if let Some((uuid, spot)) = target.filter(|(uuid, _)| uuid != local) {
                out.push(UnrootEvent { uuid, planting_spot_id: spot }.into());
            }
        }
        if frame.pressed(InputFrame::FLAG_THROW) && carrot.has_rock {
            out.extend(self.throw_rock(local, carrot.body, carrot.rock_from));
        }

        let moving_in_wheat = carrot.in_wheat && frame.has_movement();
        if moving_in_wheat != self.rustling {
            self.rustling = moving_in_wheat;
            out.push(RustleEvent { uuid: local.to_string(), is_moving: moving_in_wheat }.into());
        }

        let state = if self.dash_frames > 0 {
            EntityState::Dashing
        } else if frame.has_movement() {
            EntityState::Running
        } else {
            EntityState::Standing
        };
        self.set_local_state(local, state, out);
    }

    /// Sets, never adds, so a repeated hit only restarts the timer.
    fn stun(&mut self, uuid: &str) {
        let frames = self.game.stun_frames;
        if let Some(f) = self.world.farmer_mut(uuid) {
            f.stun_frames = frames;
        } else if let Some(c) = self.world.carrot_mut(uuid) {
            c.stun_frames = frames;
        }
    }

    // =========================================================================
    // ROUND END
    // =========================================================================

    fn round_winner(&self) -> Option<RoundWinner> {
        if self.world.all_carrots_rooted() {
            Some(RoundWinner::Farmer)
        } else if self.world.all_babies_captured() {
            Some(RoundWinner::Carrots)
        } else {
            None
        }
    }

    fn finish_round(&mut self, winner: RoundWinner) {
        let winners: Vec<String> = match winner {
            RoundWinner::Farmer => self.world.farmer.iter().map(|f| f.uuid.clone()).collect(),
            RoundWinner::Carrots => self.world.carrots.keys().cloned().collect(),
        };
        for uuid in &winners {
            self.world.award_point(uuid);
        }
        info!("Round {} won by {:?} ({})", self.round, winner, winners.join(", "));
        self.services.feedback(Cue::RoundOver);
        self.winner = Some(winner);
        self.countdown = self.game.round_over_frames;
    }
}

impl LoopPhases for GameController {
    fn pre_update(&mut self, _elapsed: Duration) {
        if !self.playing {
            return;
        }
        let frame = self.input.sample();
        if frame.has_movement() {
            self.facing = frame.move_direction();
        }

        let local = self.session.local_uuid().to_string();
        let mut out = Vec::new();
        if self.world.is_farmer(&local) {
            self.drive_farmer(&local, &frame, &mut out);
        } else {
            self.drive_carrot(&local, &frame, &mut out);
        }
        for event in out {
            self.emit(event);
        }

        if self.session.is_host() {
            self.wander.steer(&mut self.world);
        }
    }

    fn fixed_update(&mut self, step: Duration) {
        self.session.update_net();
        if !self.playing {
            return;
        }
        self.drain_inbound();

        self.session.apply_snapshots(&mut self.world.physics);
        self.world.age_rocks();
        let ledger = self.session.ownership();
        let report = self.world.physics.step(duration_to_fixed(step), |h| ledger.integrates(h));

        let local = self.session.local_uuid().to_string();
        let effects = contacts_to_events(&self.world, &report.began, &local);
        for uuid in &effects.stunned {
            self.stun(uuid);
        }
        for event in effects.events {
            self.emit(event);
        }

        self.world.update_wheat_cover();
        self.session.broadcast_snapshots(&self.world.physics);
        self.tick += 1;

        #[cfg(feature = "debug-tracing")]
        debug!(
            "Peer {} tick {} world {}",
            local,
            self.tick,
            hex::encode(self.world.compute_hash())
        );
    }

    fn post_update(&mut self, _remainder: Duration) {
        if !self.playing {
            return;
        }
        self.world.garbage_collect();

        if let Some(f) = self.world.farmer.as_mut() {
            f.stun_frames = f.stun_frames.saturating_sub(1);
        }
        for c in self.world.carrots.values_mut() {
            c.stun_frames = c.stun_frames.saturating_sub(1);
        }

        if self.winner.is_none() {
            match self.round_winner() {
                Some(winner) => self.finish_round(winner),
                None => return,
            }
        }
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        if self.session.is_host() && !self.reset_requested {
            self.reset_requested = true;
            if let Err(e) = self.session.push_out_event(ResetEvent { kind: ResetKind::Round }.into()) {
                warn!("Failed to send reset: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for GameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameController")
            .field("session", &self.session)
            .field("round", &self.round)
            .field("tick", &self.tick)
            .field("playing", &self.playing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::BABY_WANDER_SPEED;
    use crate::game::entity::ROCK_FLIGHT_TICKS;
    use crate::game::input::ScriptedInput;
    use crate::game::services::CueLog;
    use crate::network::events::CaptureBarrotEvent;
    use crate::network::session::SessionConfig;
    use crate::network::transport::LoopbackHub;
    use crate::sync::ownership::OwnershipConfig;

    const STEP: Duration = Duration::from_millis(16);

    fn config() -> SyncConfig {
        let mut config = SyncConfig::default();
        config.ownership = OwnershipConfig { snapshot_cadence_ticks: 1 };
        config
    }

    fn session(hub: &LoopbackHub, peer: &str, config: &SyncConfig) -> Session {
        let mut s = Session::new(
            Box::new(hub.connect_as(peer)),
            config.session.clone(),
            config.ownership.clone(),
        );
        s.attach_game_events();
        s
    }

    fn in_game(hub: &LoopbackHub, config: &SyncConfig) -> (Session, Session) {
        let mut host = session(hub, "host-b", config);
        let mut client = session(hub, "client-a", config);
        host.connect_as_host().unwrap();
        host.update_net();
        let room = host.room_id().unwrap().to_string();
        client.connect_as_client(&room).unwrap();
        client.update_net();
        host.update_net();
        host.start_game().unwrap();
        client.update_net();
        host.mark_ready().unwrap();
        client.mark_ready().unwrap();
        (host, client)
    }

    fn controllers(config: &SyncConfig, client_input: ScriptedInput) -> (GameController, GameController) {
        let hub = LoopbackHub::default();
        let (host, client) = in_game(&hub, config);
        let mut host = GameController::new(host, Box::new(ScriptedInput::default()), Services::null(), config);
        let mut client = GameController::new(client, Box::new(client_input), Services::null(), config);
        host.begin_match().unwrap();
        client.begin_match().unwrap();
        (host, client)
    }

    fn tally(c: &GameController, carrot: &str) -> u32 {
        c.world().carrot(carrot).unwrap().baby_carrots
    }

    #[test]
    fn test_begin_match_requires_in_game() {
        let hub = LoopbackHub::default();
        let config = config();
        let s = session(&hub, "solo", &config);
        let mut c = GameController::new(s, Box::new(ScriptedInput::default()), Services::null(), &config);
        assert!(matches!(c.begin_match(), Err(ControllerError::NotInGame(SessionStatus::Idle))));
        assert!(!c.is_playing());
    }

    #[test]
    fn test_peers_build_identical_worlds() {
        let (host, client) = controllers(&config(), ScriptedInput::default());
        assert!(host.is_playing() && client.is_playing());
        assert_eq!(host.world().compute_hash(), client.world().compute_hash());
        assert_eq!(
            host.world().farmer.as_ref().map(|f| f.uuid.clone()),
            client.world().farmer.as_ref().map(|f| f.uuid.clone())
        );
        assert_eq!(host.world().carrots.len(), 1);
    }

    #[test]
    fn test_client_events_reach_host_in_order() {
        let (mut host, mut client) = controllers(&config(), ScriptedInput::default());
        client.emit(DashEvent { uuid: "client-a".into() }.into());
        client.emit(RustleEvent { uuid: "client-a".into(), is_moving: true }.into());
        client.emit(DashEvent { uuid: "client-a".into() }.into());

        host.fixed_update(STEP);
        let names: Vec<&str> = host.journal().iter().map(|e| e.event.name()).collect();
        assert_eq!(names, vec!["Dash", "Rustle", "Dash"]);
        assert!(host.journal().iter().all(|e| e.source == "client-a"));

        // The client does not queue its own events.
        client.fixed_update(STEP);
        assert!(client.journal().iter().all(|e| e.source != "client-a"));
    }

    #[test]
    fn test_host_applies_own_events_twice_by_default() {
        let (mut host, mut client) = controllers(&config(), ScriptedInput::default());
        let carrot = host.world().carrots.keys().next().unwrap().clone();
        host.emit(CaptureBarrotEvent { carrot_uuid: carrot.clone(), barrot_id: 0 }.into());
        assert_eq!(tally(&host, &carrot), 1);

        host.fixed_update(STEP);
        client.fixed_update(STEP);
        assert_eq!(tally(&host, &carrot), 2);
        assert_eq!(tally(&client, &carrot), 1);
    }

    #[test]
    fn test_self_echo_filter_applies_once() {
        let mut config = config();
        config.reducer.filter_self_echo = true;
        let (mut host, mut client) = controllers(&config, ScriptedInput::default());
        let carrot = host.world().carrots.keys().next().unwrap().clone();
        host.emit(CaptureBarrotEvent { carrot_uuid: carrot.clone(), barrot_id: 0 }.into());

        host.fixed_update(STEP);
        client.fixed_update(STEP);
        assert_eq!(tally(&host, &carrot), 1);
        assert_eq!(tally(&client, &carrot), 1);
    }

    #[test]
    fn test_mirrored_avatar_follows_owner() {
        let mut input = ScriptedInput::default();
        input.push_repeated(InputFrame::with_movement(127, 0), 10);
        let (mut host, mut client) = controllers(&config(), input);
        let avatar = client.world().avatar_body("client-a").unwrap();
        let start = host.world().physics.position(avatar).unwrap();

        for _ in 0..5 {
            client.pre_update(STEP);
            client.fixed_update(STEP);
            host.fixed_update(STEP);
        }
        let owned = client.world().physics.position(avatar).unwrap();
        let mirrored = host.world().physics.position(avatar).unwrap();
        assert_ne!(owned, start);
        assert_eq!(mirrored, owned);
        assert_eq!(host.session().ownership().owner_of(avatar), Some("client-a"));
    }

    #[test]
    fn test_mirrors_hold_still_before_first_snapshot() {
        let (mut host, mut client) = controllers(&config(), ScriptedInput::default());
        let babies: Vec<BodyHandle> = client.world().babies.values().map(|b| b.body).collect();
        let positions = |c: &GameController| -> Vec<Option<FixedVec2>> {
            babies.iter().map(|h| c.world().physics.position(*h)).collect()
        };
        let start = positions(&client);
        assert_eq!(client.session().ownership().owner_of(babies[0]), Some("host-b"));

        // No host snapshot has been sent yet.
        client.fixed_update(STEP);
        assert_eq!(positions(&client), start);

        host.pre_update(STEP);
        host.fixed_update(STEP);
        assert_ne!(positions(&host), start);

        // The host has the client's first snapshot; nothing newer arrives.
        let avatar = host.world().avatar_body("client-a").unwrap();
        let at = host.world().physics.position(avatar);
        host.world_mut().physics.set_velocity(avatar, FixedVec2::new(FIXED_ONE, 0));
        host.fixed_update(STEP);
        assert_eq!(host.world().physics.position(avatar), at);
    }

    #[test]
    fn test_only_host_steers_babies() {
        let (mut host, mut client) = controllers(&config(), ScriptedInput::default());
        let velocities = |c: &GameController| -> Vec<FixedVec2> {
            c.world()
                .babies
                .values()
                .filter_map(|b| c.world().physics.body(b.body).map(|body| body.linear_velocity))
                .collect()
        };
        let initial = velocities(&client);

        client.pre_update(STEP);
        assert_eq!(velocities(&client), initial);

        host.pre_update(STEP);
        let steered = velocities(&host);
        assert_ne!(steered, initial);
        for v in steered {
            let speed = v.length();
            assert!((speed - BABY_WANDER_SPEED).abs() < FIXED_ONE / 50);
        }
    }

    #[test]
    fn test_thrown_rock_stops_and_is_collected() {
        let (_host, mut client) = controllers(&config(), ScriptedInput::default());
        let avatar = client.world().avatar_body("client-a").unwrap();
        let at = client.world().physics.position(avatar).unwrap();
        client.emit(SpawnRockEvent {
            pos: at + FixedVec2::from_ints(0, 2),
            idx: -1,
            vel: FixedVec2::new(ROCK_THROW_SPEED, 0),
            uuid: "client-a".into(),
        }.into());
        assert_eq!(client.world().rocks.len(), 1);
        let rock = client.world().rocks[0].body;

        for _ in 1..ROCK_FLIGHT_TICKS {
            client.fixed_update(STEP);
            client.post_update(Duration::ZERO);
        }
        assert_eq!(client.world().rocks.len(), 1);
        assert!(client.world().physics.body(rock).is_some());

        client.fixed_update(STEP);
        client.post_update(Duration::ZERO);
        assert!(client.world().rocks.is_empty());
        assert!(client.world().physics.body(rock).is_none());
    }

    #[test]
    fn test_round_win_resets_and_keeps_points() {
        let mut config = config();
        config.game.round_over_frames = 0;
        let log = CueLog::new();
        let hub = LoopbackHub::default();
        let (h, c) = in_game(&hub, &config);
        let mut host = GameController::new(h, Box::new(ScriptedInput::default()), Services::recording(&log), &config);
        let mut client = GameController::new(c, Box::new(ScriptedInput::default()), Services::null(), &config);
        host.begin_match().unwrap();
        client.begin_match().unwrap();

        for baby in host.world_mut().babies.values_mut() {
            baby.captured = true;
        }
        host.post_update(Duration::ZERO);
        assert_eq!(host.winner(), Some(RoundWinner::Carrots));
        assert!(log.cues().contains(&Cue::RoundOver));
        let carrot = host.world().carrots.keys().next().unwrap().clone();
        assert_eq!(host.world().points.get(&carrot), Some(&1));

        // Host self-queues the reset; the client receives it.
        host.fixed_update(STEP);
        client.fixed_update(STEP);
        assert_eq!(host.round(), 1);
        assert_eq!(client.round(), 1);
        assert_eq!(host.winner(), None);
        assert_eq!(host.world().points.get(&carrot), Some(&1));
        assert!(host.world().babies.values().all(|b| !b.captured));
        assert_eq!(
            host.world().farmer.as_ref().map(|f| f.uuid.clone()),
            client.world().farmer.as_ref().map(|f| f.uuid.clone())
        );
    }

    #[test]
    fn test_ready_quorum_resets_game() {
        let (mut host, mut client) = controllers(&config(), ScriptedInput::default());
        host.world_mut().award_point("host-b");

        host.request_reset(ResetKind::Game).unwrap();
        host.fixed_update(STEP);
        assert_eq!(host.round(), 0);

        client.request_reset(ResetKind::Game).unwrap();
        host.fixed_update(STEP);
        assert_eq!(host.round(), 1);
        assert!(host.world().points.is_empty());

        client.fixed_update(STEP);
        assert_eq!(client.round(), 1);
    }

    #[test]
    fn test_disconnect_stops_play() {
        let (mut host, _client) = controllers(&config(), ScriptedInput::default());
        host.disconnect();
        assert!(!host.is_playing());
        assert_eq!(host.session().get_status(), SessionStatus::Idle);

        let tick = host.tick();
        host.fixed_update(STEP);
        assert_eq!(host.tick(), tick);
        assert!(host.request_reset(ResetKind::Round).is_err());
    }
}
