//! Contact Handling
//!
//! Turns contacts reported by the obstacle world into game events. Only
//! contacts involving the local avatar produce events, so each interaction
//! is announced by exactly one peer.
//!
//! Rock stuns follow the same rule: only the victim's own peer stuns its
//! avatar. Everyone else learns of it through the `Move(Stunned)` event the
//! victim sends on its next frame.

use crate::core::fixed::{fixed_mul, ROCK_MIN_STUN_SPEED};
use crate::game::entity::{EntityRef, EntityState};
use crate::game::state::SharedWorld;
use crate::network::events::{CaptureBarrotEvent, CaptureEvent, CollectedRockEvent, GameEvent};
use crate::physics::world::{BodyHandle, Contact};

/// What a step's new contacts mean for the game.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ContactEffects {
    /// Events for the local peer to send.
    pub events: Vec<GameEvent>,
    /// The local avatar, when a rock thrown by someone else hit it hard enough.
    pub stunned: Vec<String>,
}

/// Interpret contacts that began this step.
pub fn contacts_to_events(world: &SharedWorld, began: &[Contact], local_uuid: &str) -> ContactEffects {
    let mut effects = ContactEffects::default();
    for contact in began {
        // Each pair is examined from both sides.
        for (mine, other) in [(contact.a, contact.b), (contact.b, contact.a)] {
            let (Some(me), Some(them)) = (world.entity_of(mine), world.entity_of(other)) else {
                continue;
            };
            match (me, them) {
                (EntityRef::Farmer(f), EntityRef::Carrot(c)) if f == local_uuid => {
                    if farmer_can_capture(world, f, c) {
                        effects.events.push(CaptureEvent { uuid: c.clone() }.into());
                    }
                }
                (EntityRef::Carrot(c), EntityRef::Baby(id)) if c == local_uuid => {
                    let dashing = world.carrot(c).map(|c| c.state == EntityState::Dashing).unwrap_or(false);
                    let free = world.baby(*id).map(|b| !b.captured).unwrap_or(false);
                    if dashing && free {
                        effects.events.push(CaptureBarrotEvent { carrot_uuid: c.clone(), barrot_id: *id }.into());
                    }
                }
                (EntityRef::Farmer(uuid) | EntityRef::Carrot(uuid), EntityRef::RockSpawn(idx)) if uuid == local_uuid => {
                    if can_pick_up(world, uuid, *idx) {
                        effects.events.push(CollectedRockEvent { uuid: uuid.clone(), rock_id: *idx }.into());
                    }
                }
                (EntityRef::Rock, EntityRef::Farmer(uuid) | EntityRef::Carrot(uuid)) if uuid == local_uuid => {
                    let thrown_by_other = thrower_of(world, mine).map(|t| t != uuid).unwrap_or(true);
                    if thrown_by_other && hits_hard(world, mine, other) && !effects.stunned.contains(uuid) {
                        effects.stunned.push(uuid.clone());
                    }
                }
                _ => {}
            }
        }
    }
    effects
}

fn farmer_can_capture(world: &SharedWorld, farmer: &str, carrot: &str) -> bool {
    let Some(f) = world.farmer(farmer) else {
        return false;
    };
    let Some(c) = world.carrot(carrot) else {
        return false;
    };
    f.state == EntityState::Dashing && !f.holding_carrot && !c.captured && !c.rooted
}

fn can_pick_up(world: &SharedWorld, uuid: &str, idx: i32) -> bool {
    let available = world.rock_spawns.get(&idx).map(|s| s.available).unwrap_or(false);
    let ready = match (world.farmer(uuid), world.carrot(uuid)) {
        (Some(f), _) => !f.has_rock,
        (None, Some(c)) => !c.has_rock && !c.captured && !c.rooted,
        _ => false,
    };
    available && ready
}

/// Closing speed between `rock` and `target` exceeds `ROCK_MIN_STUN_SPEED`.
fn hits_hard(world: &SharedWorld, rock: BodyHandle, target: BodyHandle) -> bool {
    let (Some(r), Some(t)) = (world.physics.body(rock), world.physics.body(target)) else {
        return false;
    };
    let relative = r.linear_velocity - t.linear_velocity;
    relative.length_squared() > fixed_mul(ROCK_MIN_STUN_SPEED, ROCK_MIN_STUN_SPEED)
}

fn thrower_of(world: &SharedWorld, rock: BodyHandle) -> Option<&str> {
    world.rocks.iter().find(|r| r.body == rock).map(|r| r.thrower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FARMER_SPEED, FIXED_ONE, ROCK_RADIUS, ROCK_THROW_SPEED};
    use crate::core::vec2::FixedVec2;
    use crate::game::entity::ThrownRock;
    use crate::game::map::{generate, GameConfig};
    use crate::physics::world::BodyDef;

    fn world() -> SharedWorld {
        let roster = vec!["c1".to_string(), "f1".to_string()];
        generate(&GameConfig::default(), &roster, "f1", 5, 0)
    }

    /// Move `a` onto `b` and step once, returning the contacts that began.
    fn touch(w: &mut SharedWorld, a: BodyHandle, b: BodyHandle) -> Vec<Contact> {
        let at = w.physics.position(b).unwrap();
        w.physics.place(a, at);
        w.physics.step(0, |_| false).began
    }

    #[test]
    fn test_dashing_farmer_captures() {
        let mut w = world();
        let farmer = w.farmer("f1").unwrap().body;
        let carrot = w.carrot("c1").unwrap().body;
        let began = touch(&mut w, farmer, carrot);

        let capture: GameEvent = CaptureEvent { uuid: "c1".into() }.into();
        assert!(!contacts_to_events(&w, &began, "f1").events.contains(&capture));

        w.farmer.as_mut().unwrap().state = EntityState::Dashing;
        assert!(contacts_to_events(&w, &began, "f1").events.contains(&capture));

        // The carrot's peer does not announce the capture.
        assert!(!contacts_to_events(&w, &began, "c1").events.contains(&capture));

        // Nor does a farmer already holding a carrot.
        w.farmer.as_mut().unwrap().holding_carrot = true;
        assert!(!contacts_to_events(&w, &began, "f1").events.contains(&capture));
    }

    #[test]
    fn test_dashing_carrot_collects_baby() {
        let mut w = world();
        let carrot = w.carrot("c1").unwrap().body;
        let baby = w.baby(0).unwrap().body;
        w.carrot_mut("c1").unwrap().state = EntityState::Dashing;
        let began = touch(&mut w, carrot, baby);

        let effects = contacts_to_events(&w, &began, "c1");
        assert!(effects.events.contains(&CaptureBarrotEvent { carrot_uuid: "c1".into(), barrot_id: 0 }.into()));
    }

    #[test]
    fn test_rock_pickup_requires_empty_hands() {
        let mut w = world();
        let carrot = w.carrot("c1").unwrap().body;
        let spawn = w.rock_spawns[&0].body;
        let began = touch(&mut w, carrot, spawn);

        let effects = contacts_to_events(&w, &began, "c1");
        assert!(effects.events.contains(&CollectedRockEvent { uuid: "c1".into(), rock_id: 0 }.into()));

        w.carrot_mut("c1").unwrap().has_rock = true;
        let effects = contacts_to_events(&w, &began, "c1");
        assert!(!effects.events.iter().any(|e| matches!(e, GameEvent::CollectedRock(_))));
    }

    /// Put a rock moving at `velocity` right next to the farmer and step once.
    fn rock_at_farmer(w: &mut SharedWorld, thrower: &str, velocity: FixedVec2) -> Vec<Contact> {
        let farmer = w.farmer("f1").unwrap().body;
        let at = w.physics.position(farmer).unwrap() + FixedVec2::new(FIXED_ONE / 4, 0);
        let rock = w.spawn(EntityRef::Rock, BodyDef::dynamic("", at, ROCK_RADIUS).with_velocity(velocity));
        w.rocks.push(ThrownRock::new(rock, thrower, velocity));
        w.physics.step(0, |_| false).began
    }

    #[test]
    fn test_rock_stuns_others_only() {
        let mut w = world();
        let began = rock_at_farmer(&mut w, "c1", FixedVec2::new(-ROCK_THROW_SPEED, 0));

        let effects = contacts_to_events(&w, &began, "f1");
        assert_eq!(effects.stunned, vec!["f1".to_string()]);

        w.rocks[0].thrower = "f1".into();
        assert!(contacts_to_events(&w, &began, "f1").stunned.is_empty());
    }

    #[test]
    fn test_only_victim_peer_applies_stun() {
        let mut w = world();
        let began = rock_at_farmer(&mut w, "c1", FixedVec2::new(-ROCK_THROW_SPEED, 0));

        assert_eq!(contacts_to_events(&w, &began, "f1").stunned, vec!["f1".to_string()]);
        assert!(contacts_to_events(&w, &began, "c1").stunned.is_empty());
    }

    #[test]
    fn test_slow_rock_does_not_stun() {
        let mut w = world();
        let began = rock_at_farmer(&mut w, "c1", FixedVec2::new(-FIXED_ONE, 0));
        assert!(!began.is_empty());
        assert!(contacts_to_events(&w, &began, "f1").stunned.is_empty());

        // A farmer walking into a slow rock closes fast enough.
        let farmer = w.farmer("f1").unwrap().body;
        w.physics.set_velocity(farmer, FixedVec2::new(FARMER_SPEED, 0));
        assert_eq!(contacts_to_events(&w, &began, "f1").stunned, vec!["f1".to_string()]);
    }
}
