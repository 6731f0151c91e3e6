//! Event Reducer
//!
//! One transition per event kind, selected by a single match over
//! [`GameEvent`]. The reducer is the only code that mutates shared
//! entities on behalf of the network.
//!
//! ## Double application
//!
//! The originating peer applies most kinds to its own world before sending
//! them. The host also receives its own events back through the session's
//! self-apply queue, so by default those kinds are applied twice there.
//! `Move` is the only kind with a built-in self-filter. Setting
//! [`ReducerOptions::filter_self_echo`] skips the queued copy instead.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::ROCK_RADIUS;
use crate::game::entity::{
    EntityRef, EntityState, ThrownRock, CARROT_DRAW_PRIORITY, FARMER_DRAW_PRIORITY,
};
use crate::game::services::{Cue, Services};
use crate::game::state::SharedWorld;
use crate::network::events::{GameEvent, ResetKind};
use crate::physics::world::{BodyDef, BodyKind};

/// Reducer behaviour switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerOptions {
    /// Skip queued events from the local peer that were already applied
    /// optimistically.
    pub filter_self_echo: bool,
    /// Apply locally originated events before sending them.
    pub optimistic_local_apply: bool,
}

impl Default for ReducerOptions {
    fn default() -> Self {
        Self {
            filter_self_echo: false,
            optimistic_local_apply: true,
        }
    }
}

/// Why an event was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Local echo of an optimistically applied event.
    SelfEcho,
    /// `Move` for the local avatar.
    LocalMove,
    /// Referenced entity does not exist in this world.
    UnknownEntity,
}

/// Result of reducing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// World mutated.
    Applied,
    /// Nothing changed.
    Skipped(SkipReason),
    /// Caller must rebuild the world.
    Reset(ResetKind),
    /// Source peer is ready for a reset.
    Ready(ResetKind),
}

/// What the reducer needs besides the world.
pub struct ReduceContext<'a> {
    /// This peer's UUID.
    pub local_uuid: &'a str,
    /// Behaviour switches.
    pub options: &'a ReducerOptions,
    /// Feedback services.
    pub services: &'a mut Services,
}

struct AvatarMut<'w> {
    state: &'w mut EntityState,
    has_rock: &'w mut bool,
    rock_from: &'w mut Option<i32>,
}

fn avatar_mut<'w>(world: &'w mut SharedWorld, uuid: &str) -> Option<AvatarMut<'w>> {
    if let Some(f) = world.farmer.as_mut().filter(|f| f.uuid == uuid) {
        return Some(AvatarMut { state: &mut f.state, has_rock: &mut f.has_rock, rock_from: &mut f.rock_from });
    }
    world.carrots.get_mut(uuid).map(|c| AvatarMut {
        state: &mut c.state,
        has_rock: &mut c.has_rock,
        rock_from: &mut c.rock_from,
    })
}

fn unknown(event: &GameEvent, what: &str) -> ReduceOutcome {
    debug!("Skipping {}: unknown {}", event.name(), what);
    ReduceOutcome::Skipped(SkipReason::UnknownEntity)
}

/// Apply one event from `source` to `world`.
pub fn apply_event(
    world: &mut SharedWorld,
    source: &str,
    event: &GameEvent,
    ctx: &mut ReduceContext<'_>,
) -> ReduceOutcome {
    if ctx.options.filter_self_echo
        && ctx.options.optimistic_local_apply
        && source == ctx.local_uuid
        && event.applies_optimistically()
    {
        debug!("Skipping local echo of {}", event.name());
        return ReduceOutcome::Skipped(SkipReason::SelfEcho);
    }

    match event {
        GameEvent::Capture(e) => {
            let Some(farmer) = world.farmer.as_mut() else {
                return unknown(event, "farmer");
            };
            let Some(carrot) = world.carrots.get_mut(&e.uuid) else {
                return unknown(event, "carrot");
            };
            let at = world.physics.position(farmer.body).unwrap_or_default();
            carrot.captured = true;
            carrot.shakes = 0;
            carrot.state = EntityState::Caught;
            carrot.draw_priority = FARMER_DRAW_PRIORITY + 1;
            farmer.holding_carrot = true;
            farmer.held_carrot = Some(e.uuid.clone());
            farmer.state = EntityState::Carrying;
            world.physics.place(carrot.body, at);
            ctx.services.feedback(Cue::Capture);
        }

        GameEvent::Root(e) => {
            let Some(spot) = world.planting_spots.get_mut(&e.planting_spot_id) else {
                return unknown(event, "planting spot");
            };
            let Some(carrot) = world.carrots.get_mut(&e.uuid) else {
                return unknown(event, "carrot");
            };
            let at = world.physics.position(spot.body).unwrap_or_default();
            carrot.rooted = true;
            carrot.captured = false;
            carrot.rooted_in = Some(spot.id);
            carrot.state = EntityState::Rooted;
            carrot.draw_priority = CARROT_DRAW_PRIORITY;
            spot.carrot_planted = true;
            world.physics.set_kind(carrot.body, BodyKind::Static);
            world.physics.place(carrot.body, at);
            if let Some(farmer) = world.farmer.as_mut() {
                farmer.holding_carrot = false;
                farmer.held_carrot = None;
                farmer.state = EntityState::Standing;
            }
            ctx.services.feedback(Cue::Root);
        }

        GameEvent::Unroot(e) => {
            let Some(spot) = world.planting_spots.get_mut(&e.planting_spot_id) else {
                return unknown(event, "planting spot");
            };
            let Some(carrot) = world.carrots.get_mut(&e.uuid) else {
                return unknown(event, "carrot");
            };
            carrot.rooted = false;
            carrot.rooted_in = None;
            carrot.state = EntityState::Standing;
            spot.carrot_planted = false;
            world.physics.set_kind(carrot.body, BodyKind::Dynamic);
            ctx.services.feedback(Cue::Unroot);
        }

        GameEvent::Move(e) => {
            if e.uuid == ctx.local_uuid {
                return ReduceOutcome::Skipped(SkipReason::LocalMove);
            }
            let Some(avatar) = avatar_mut(world, &e.uuid) else {
                return unknown(event, "avatar");
            };
            *avatar.state = e.state;
        }

        GameEvent::CaptureBarrot(e) => {
            let Some(baby) = world.babies.get_mut(&e.barrot_id) else {
                return unknown(event, "baby carrot");
            };
            let Some(carrot) = world.carrots.get_mut(&e.carrot_uuid) else {
                return unknown(event, "carrot");
            };
            baby.captured = true;
            carrot.baby_carrots += 1;
            world.physics.remove_body(baby.body);
            ctx.services.feedback(Cue::CollectBaby);
        }

        GameEvent::Free(e) => {
            let Some(carrot) = world.carrots.get_mut(&e.uuid) else {
                return unknown(event, "carrot");
            };
            carrot.captured = false;
            carrot.shakes = 0;
            carrot.state = EntityState::Standing;
            carrot.draw_priority = CARROT_DRAW_PRIORITY;
            if let Some(farmer) = world.farmer.as_mut() {
                farmer.holding_carrot = false;
                farmer.held_carrot = None;
                farmer.state = EntityState::Standing;
                farmer.draw_priority = FARMER_DRAW_PRIORITY;
            }
            ctx.services.feedback(Cue::Free);
        }

        GameEvent::SpawnRock(e) => {
            let Some(thrower) = avatar_mut(world, &e.uuid) else {
                return unknown(event, "thrower");
            };
            *thrower.has_rock = false;
            *thrower.rock_from = None;
            let body = world.spawn(
                EntityRef::Rock,
                BodyDef::dynamic("", e.pos, ROCK_RADIUS).with_velocity(e.vel),
            );
            world.rocks.push(ThrownRock::new(body, e.uuid.clone(), e.vel));
            if let Some(spawn) = world.rock_spawns.get_mut(&e.idx) {
                spawn.available = true;
            }
            ctx.services.audio.play(Cue::ThrowRock);
        }

        GameEvent::CollectedRock(e) => {
            if !world.rock_spawns.contains_key(&e.rock_id) {
                return unknown(event, "rock spawn");
            }
            let Some(avatar) = avatar_mut(world, &e.uuid) else {
                return unknown(event, "avatar");
            };
            *avatar.has_rock = true;
            *avatar.rock_from = Some(e.rock_id);
            if let Some(spawn) = world.rock_spawns.get_mut(&e.rock_id) {
                spawn.available = false;
            }
            ctx.services.feedback(Cue::PickupRock);
        }

        GameEvent::Reset(e) => return ReduceOutcome::Reset(e.kind),

        GameEvent::Ready(e) => return ReduceOutcome::Ready(e.kind),

        GameEvent::Rustle(e) => {
            let Some(carrot) = world.carrots.get_mut(&e.uuid) else {
                return unknown(event, "carrot");
            };
            carrot.rustling = e.is_moving;
            if e.is_moving {
                ctx.services.audio.play(Cue::Rustle);
            }
        }

        GameEvent::Dash(e) => {
            let Some(avatar) = avatar_mut(world, &e.uuid) else {
                return unknown(event, "avatar");
            };
            *avatar.state = EntityState::Dashing;
            ctx.services.audio.play(Cue::Dash);
        }
    }

    ReduceOutcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::FixedVec2;
    use crate::game::map::{generate, GameConfig};
    use crate::game::services::CueLog;
    use crate::network::events::{
        CaptureBarrotEvent, CaptureEvent, CollectedRockEvent, DashEvent, FreeEvent, MoveEvent,
        ReadyEvent, ResetEvent, RootEvent, RustleEvent, SpawnRockEvent, UnrootEvent,
    };

    fn world() -> SharedWorld {
        let roster = vec!["c1".to_string(), "f1".to_string()];
        generate(&GameConfig::default(), &roster, "f1", 11, 0)
    }

    fn apply(world: &mut SharedWorld, source: &str, local: &str, options: &ReducerOptions, event: GameEvent) -> ReduceOutcome {
        let mut services = Services::null();
        let mut ctx = ReduceContext { local_uuid: local, options, services: &mut services };
        apply_event(world, source, &event, &mut ctx)
    }

    fn defaults() -> ReducerOptions {
        ReducerOptions::default()
    }

    #[test]
    fn test_capture_marks_carrot_and_farmer() {
        let mut w = world();
        assert!(!w.carrot("c1").unwrap().is_captured());

        let outcome = apply(&mut w, "f1", "c1", &defaults(), CaptureEvent { uuid: "c1".into() }.into());
        assert_eq!(outcome, ReduceOutcome::Applied);
        assert!(w.carrot("c1").unwrap().is_captured());
        assert!(w.farmer("f1").unwrap().is_holding_carrot());
        assert_eq!(w.carrot("c1").unwrap().state, EntityState::Caught);

        let farmer_pos = w.physics.position(w.farmer("f1").unwrap().body);
        assert_eq!(w.physics.position(w.carrot("c1").unwrap().body), farmer_pos);
        assert!(w.carrot("c1").unwrap().draw_priority > w.farmer("f1").unwrap().draw_priority);
    }

    #[test]
    fn test_root_then_unroot() {
        let mut w = world();
        apply(&mut w, "f1", "c1", &defaults(), CaptureEvent { uuid: "c1".into() }.into());
        apply(&mut w, "f1", "c1", &defaults(), RootEvent { uuid: "c1".into(), planting_spot_id: 3 }.into());

        assert!(w.carrot("c1").unwrap().is_rooted());
        assert!(w.planting_spot(3).unwrap().carrot_planted);
        assert!(!w.farmer("f1").unwrap().is_holding_carrot());
        let body = w.carrot("c1").unwrap().body;
        assert_eq!(w.physics.body(body).unwrap().kind, BodyKind::Static);
        assert_eq!(w.physics.position(body), w.physics.position(w.planting_spot(3).unwrap().body));

        apply(&mut w, "c2", "c1", &defaults(), UnrootEvent { uuid: "c1".into(), planting_spot_id: 3 }.into());
        assert!(!w.carrot("c1").unwrap().is_rooted());
        assert!(!w.planting_spot(3).unwrap().carrot_planted);
        assert_eq!(w.physics.body(body).unwrap().kind, BodyKind::Dynamic);
    }

    #[test]
    fn test_move_skips_local_avatar() {
        let mut w = world();
        let outcome = apply(&mut w, "c1", "c1", &defaults(), MoveEvent { uuid: "c1".into(), state: EntityState::Running }.into());
        assert_eq!(outcome, ReduceOutcome::Skipped(SkipReason::LocalMove));
        assert_eq!(w.carrot("c1").unwrap().state, EntityState::Standing);

        let outcome = apply(&mut w, "c1", "f1", &defaults(), MoveEvent { uuid: "c1".into(), state: EntityState::Running }.into());
        assert_eq!(outcome, ReduceOutcome::Applied);
        assert_eq!(w.carrot("c1").unwrap().state, EntityState::Running);
    }

    #[test]
    fn test_local_echo_applies_twice_by_default() {
        let mut w = world();
        let event: GameEvent = CaptureBarrotEvent { carrot_uuid: "c1".into(), barrot_id: 0 }.into();

        // Optimistic apply, then the host's queued copy.
        assert_eq!(apply(&mut w, "c1", "c1", &defaults(), event.clone()), ReduceOutcome::Applied);
        assert_eq!(apply(&mut w, "c1", "c1", &defaults(), event), ReduceOutcome::Applied);
        assert_eq!(w.carrot("c1").unwrap().baby_carrots, 2);
    }

    #[test]
    fn test_filter_self_echo_skips_queued_copy() {
        let mut w = world();
        let options = ReducerOptions { filter_self_echo: true, ..Default::default() };
        let event: GameEvent = CaptureBarrotEvent { carrot_uuid: "c1".into(), barrot_id: 0 }.into();

        // The optimistic path calls the reducer with the filter bypassed.
        assert_eq!(apply(&mut w, "c1", "c1", &defaults(), event.clone()), ReduceOutcome::Applied);
        assert_eq!(
            apply(&mut w, "c1", "c1", &options, event.clone()),
            ReduceOutcome::Skipped(SkipReason::SelfEcho)
        );
        assert_eq!(w.carrot("c1").unwrap().baby_carrots, 1);

        // Remote copies still apply.
        assert_eq!(apply(&mut w, "f1", "c1", &options, event), ReduceOutcome::Applied);
        assert_eq!(w.carrot("c1").unwrap().baby_carrots, 2);
    }

    #[test]
    fn test_filter_never_blocks_reset_or_move() {
        let mut w = world();
        let options = ReducerOptions { filter_self_echo: true, ..Default::default() };
        assert_eq!(
            apply(&mut w, "f1", "f1", &options, ResetEvent { kind: ResetKind::Round }.into()),
            ReduceOutcome::Reset(ResetKind::Round)
        );
        assert_eq!(
            apply(&mut w, "f1", "f1", &options, ReadyEvent { kind: ResetKind::Game }.into()),
            ReduceOutcome::Ready(ResetKind::Game)
        );
    }

    #[test]
    fn test_capture_barrot_removes_baby() {
        let mut w = world();
        let body = w.baby(2).unwrap().body;
        apply(&mut w, "c1", "f1", &defaults(), CaptureBarrotEvent { carrot_uuid: "c1".into(), barrot_id: 2 }.into());
        assert!(w.baby(2).unwrap().captured);
        assert!(w.physics.body(body).is_none());
        w.garbage_collect();
        assert!(w.entity_of(body).is_none());
    }

    #[test]
    fn test_free_releases_carrot() {
        let mut w = world();
        apply(&mut w, "f1", "c1", &defaults(), CaptureEvent { uuid: "c1".into() }.into());
        apply(&mut w, "c1", "f1", &defaults(), FreeEvent { uuid: "c1".into() }.into());
        assert!(!w.carrot("c1").unwrap().is_captured());
        assert!(!w.farmer("f1").unwrap().is_holding_carrot());
        assert_eq!(w.carrot("c1").unwrap().draw_priority, CARROT_DRAW_PRIORITY);
    }

    #[test]
    fn test_rock_pickup_and_throw() {
        let mut w = world();
        apply(&mut w, "c1", "f1", &defaults(), CollectedRockEvent { uuid: "c1".into(), rock_id: 1 }.into());
        assert!(w.carrot("c1").unwrap().has_rock);
        assert!(!w.rock_spawns[&1].available);

        let throw = SpawnRockEvent {
            pos: FixedVec2::from_ints(1, 1),
            idx: 1,
            vel: FixedVec2::from_ints(5, 0),
            uuid: "c1".into(),
        };
        let before = w.physics.len();
        apply(&mut w, "c1", "f1", &defaults(), throw.into());
        assert!(!w.carrot("c1").unwrap().has_rock);
        assert!(w.rock_spawns[&1].available);
        assert_eq!(w.rocks.len(), 1);
        assert_eq!(w.physics.len(), before + 1);
        let rock = w.physics.body(w.rocks[0].body).unwrap();
        assert_eq!(rock.name, "rock");
        assert_eq!(rock.linear_velocity, FixedVec2::from_ints(5, 0));
    }

    #[test]
    fn test_unknown_entities_are_skipped() {
        let mut w = world();
        let skipped = ReduceOutcome::Skipped(SkipReason::UnknownEntity);
        assert_eq!(apply(&mut w, "f1", "c1", &defaults(), CaptureEvent { uuid: "ghost".into() }.into()), skipped);
        assert_eq!(apply(&mut w, "f1", "c1", &defaults(), RootEvent { uuid: "c1".into(), planting_spot_id: 99 }.into()), skipped);
        assert_eq!(apply(&mut w, "c1", "f1", &defaults(), CaptureBarrotEvent { carrot_uuid: "c1".into(), barrot_id: -1 }.into()), skipped);
        assert_eq!(apply(&mut w, "c1", "f1", &defaults(), CollectedRockEvent { uuid: "c1".into(), rock_id: 42 }.into()), skipped);
        assert_eq!(apply(&mut w, "c1", "f1", &defaults(), DashEvent { uuid: "".into() }.into()), skipped);
    }

    #[test]
    fn test_visual_events_and_cues() {
        let mut w = world();
        let log = CueLog::new();
        let mut services = Services::recording(&log);
        let options = defaults();
        let mut ctx = ReduceContext { local_uuid: "f1", options: &options, services: &mut services };

        apply_event(&mut w, "c1", &RustleEvent { uuid: "c1".into(), is_moving: true }.into(), &mut ctx);
        apply_event(&mut w, "c1", &DashEvent { uuid: "c1".into() }.into(), &mut ctx);
        assert!(w.carrot("c1").unwrap().rustling);
        assert_eq!(w.carrot("c1").unwrap().state, EntityState::Dashing);
        assert_eq!(log.cues(), vec![Cue::Rustle, Cue::Dash]);
    }
}
