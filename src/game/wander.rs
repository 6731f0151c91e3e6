//! Baby Carrot Wandering
//!
//! The host steers every free baby carrot toward a random target inside the
//! field and picks a fresh one on arrival. Other peers only see the result
//! through the host's snapshots, so targets never leave the host.
//!
//! ```text
//! no target / within BABY_ARRIVE_RADIUS  →  new target from the round rng
//! otherwise                              →  velocity = dir(target) × speed
//! ```

use std::collections::BTreeMap;
use tracing::trace;

use crate::core::fixed::{BABY_ARRIVE_RADIUS, BABY_WANDER_SPEED};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::map::EDGE_MARGIN;
use crate::game::state::SharedWorld;
use crate::physics::world::BodyHandle;

/// Mixed into the round seed so targets do not replay the map layout.
const WANDER_SALT: u64 = 0xB0BB_1E5C_A770_7000;

/// Per-round wander targets for the baby carrots.
#[derive(Clone, Debug)]
pub struct BabyWander {
    rng: DeterministicRng,
    targets: BTreeMap<i32, FixedVec2>,
}

impl BabyWander {
    /// Wanderer for the round generated from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(seed ^ WANDER_SALT),
            targets: BTreeMap::new(),
        }
    }

    /// Current target of baby `id`.
    pub fn target(&self, id: i32) -> Option<FixedVec2> {
        self.targets.get(&id).copied()
    }

    /// Point every free baby carrot at its target, retargeting on arrival.
    pub fn steer(&mut self, world: &mut SharedWorld) {
        let free: Vec<(i32, BodyHandle)> = world
            .babies
            .values()
            .filter(|b| !b.captured)
            .map(|b| (b.id, b.body))
            .collect();

        for (id, body) in free {
            let Some(at) = world.physics.position(body) else {
                continue;
            };
            let target = match self.targets.get(&id) {
                Some(t) if !t.within(at, BABY_ARRIVE_RADIUS) => *t,
                _ => {
                    let t = self.rng.field_position(EDGE_MARGIN);
                    trace!("Baby {} heading for ({}, {})", id, t.x, t.y);
                    self.targets.insert(id, t);
                    t
                }
            };
            let velocity = (target - at).normalize().scale(BABY_WANDER_SPEED);
            world.physics.set_velocity(body, velocity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::{generate, GameConfig};

    fn world() -> SharedWorld {
        let roster = vec!["c1".to_string(), "f1".to_string()];
        generate(&GameConfig::default(), &roster, "f1", 11, 0)
    }

    fn velocity(world: &SharedWorld, id: i32) -> FixedVec2 {
        let body = world.baby(id).unwrap().body;
        world.physics.body(body).unwrap().linear_velocity
    }

    #[test]
    fn test_baby_heads_for_target() {
        let mut world = world();
        let mut wander = BabyWander::new(world.seed);
        wander.steer(&mut world);

        for baby in world.babies.values() {
            let at = world.physics.position(baby.body).unwrap();
            let target = wander.target(baby.id).unwrap();
            let expected = (target - at).normalize().scale(BABY_WANDER_SPEED);
            assert_eq!(world.physics.body(baby.body).unwrap().linear_velocity, expected);
        }
    }

    #[test]
    fn test_baby_changes_heading_on_arrival() {
        let mut world = world();
        let mut wander = BabyWander::new(world.seed);
        wander.steer(&mut world);
        let first_target = wander.target(0).unwrap();
        let first_heading = velocity(&world, 0);

        // Still travelling: same target.
        wander.steer(&mut world);
        assert_eq!(wander.target(0), Some(first_target));

        let body = world.baby(0).unwrap().body;
        world.physics.place(body, first_target);
        wander.steer(&mut world);
        assert_ne!(wander.target(0), Some(first_target));
        assert_ne!(velocity(&world, 0), first_heading);
    }

    #[test]
    fn test_targets_follow_seed() {
        let mut a = world();
        let mut b = world();
        let mut wa = BabyWander::new(a.seed);
        let mut wb = BabyWander::new(b.seed);
        wa.steer(&mut a);
        wb.steer(&mut b);
        for id in a.babies.keys() {
            assert_eq!(wa.target(*id), wb.target(*id));
        }
    }

    #[test]
    fn test_captured_babies_left_alone() {
        let mut world = world();
        world.babies.get_mut(&0).unwrap().captured = true;
        let before = velocity(&world, 0);

        let mut wander = BabyWander::new(world.seed);
        wander.steer(&mut world);
        assert_eq!(wander.target(0), None);
        assert_eq!(velocity(&world, 0), before);
        assert!(wander.target(1).is_some());
    }
}
