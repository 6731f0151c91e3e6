//! Shared World State
//!
//! Semantic entities plus the obstacle arena they live in. Entities hold
//! body handles, the arena holds transforms, and `body_index` maps a handle
//! back to the entity it stands for. Iteration is always in BTreeMap order,
//! so every peer walks entities identically.

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::hash::{StateHash, StateHasher};
use crate::core::vec2::FixedVec2;
use crate::game::entity::{
    BabyCarrot, Carrot, EntityRef, Farmer, PlantingSpot, RockSpawn, ThrownRock, ROCK_FLIGHT_TICKS,
    WHEAT_TAG,
};
use crate::physics::world::{BodyDef, BodyHandle, ObstacleWorld};

/// Everything peers keep in agreement.
#[derive(Debug, Default)]
pub struct SharedWorld {
    /// Obstacle arena.
    pub physics: ObstacleWorld,
    /// The farmer, once the map is built.
    pub farmer: Option<Farmer>,
    /// Carrots by UUID.
    pub carrots: BTreeMap<String, Carrot>,
    /// Baby carrots by id.
    pub babies: BTreeMap<i32, BabyCarrot>,
    /// Planting spots by id.
    pub planting_spots: BTreeMap<i32, PlantingSpot>,
    /// Rock spawns by index.
    pub rock_spawns: BTreeMap<i32, RockSpawn>,
    /// Rocks in flight.
    pub rocks: Vec<ThrownRock>,
    /// Wheat patch sensors.
    pub wheat: Vec<BodyHandle>,
    /// Field boundary posts.
    pub boundaries: Vec<BodyHandle>,
    /// Round wins per peer UUID. Survives round resets.
    pub points: BTreeMap<String, u32>,
    /// Round number, starting at 0.
    pub round: u32,
    /// Seed the current map was generated from.
    pub seed: u64,
    body_index: BTreeMap<BodyHandle, EntityRef>,
}

impl SharedWorld {
    /// Empty world for `round` generated from `seed`.
    pub fn new(seed: u64, round: u32) -> Self {
        Self {
            seed,
            round,
            ..Default::default()
        }
    }

    // =========================================================================
    // BODIES
    // =========================================================================

    /// Create a body for `entity`, tagged with its kind.
    pub fn spawn(&mut self, entity: EntityRef, def: BodyDef) -> BodyHandle {
        let def = BodyDef { name: entity.tag().to_string(), ..def };
        let handle = self.physics.create_body(def);
        self.body_index.insert(handle, entity);
        handle
    }

    /// What `handle` stands for.
    pub fn entity_of(&self, handle: BodyHandle) -> Option<&EntityRef> {
        self.body_index.get(&handle)
    }

    /// Mark a body for removal at the next garbage collection.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.physics.remove_body(handle)
    }

    /// Drop removed bodies and every reference to them.
    pub fn garbage_collect(&mut self) -> Vec<BodyHandle> {
        let removed = self.physics.garbage_collect();
        for handle in &removed {
            self.body_index.remove(handle);
        }
        if !removed.is_empty() {
            self.rocks.retain(|r| !removed.contains(&r.body));
            debug!("Collected {} bodies", removed.len());
        }
        removed
    }

    /// Slow every rock in flight by one step. Returns how many stopped.
    ///
    /// Speed falls linearly from the launch speed to zero over
    /// `ROCK_FLIGHT_TICKS`. Direction follows the current velocity, so edge
    /// bounces are kept. A stopped rock is marked for removal.
    pub fn age_rocks(&mut self) -> usize {
        let mut stopped = 0;
        for rock in self.rocks.iter_mut().filter(|r| !r.stopped()) {
            rock.age += 1;
            let Some(body) = self.physics.body_mut(rock.body) else {
                continue;
            };
            if rock.stopped() {
                body.linear_velocity = FixedVec2::ZERO;
                self.physics.remove_body(rock.body);
                stopped += 1;
                continue;
            }
            let remaining = i64::from(ROCK_FLIGHT_TICKS - rock.age);
            let slowed = |launch: i32, current: i32| {
                let magnitude = i64::from(launch).abs() * remaining / i64::from(ROCK_FLIGHT_TICKS);
                magnitude as i32 * current.signum()
            };
            body.linear_velocity = FixedVec2::new(
                slowed(rock.launch_velocity.x, body.linear_velocity.x),
                slowed(rock.launch_velocity.y, body.linear_velocity.y),
            );
        }
        stopped
    }

    /// Bodies not belonging to an avatar.
    pub fn shared_bodies(&self) -> Vec<BodyHandle> {
        self.body_index
            .iter()
            .filter(|(_, entity)| !entity.is_avatar() && **entity != EntityRef::Rock)
            .map(|(handle, _)| *handle)
            .collect()
    }

    // =========================================================================
    // AVATARS
    // =========================================================================

    /// Farmer with `uuid`.
    pub fn farmer(&self, uuid: &str) -> Option<&Farmer> {
        self.farmer.as_ref().filter(|f| f.uuid == uuid)
    }

    /// Mutable farmer with `uuid`.
    pub fn farmer_mut(&mut self, uuid: &str) -> Option<&mut Farmer> {
        self.farmer.as_mut().filter(|f| f.uuid == uuid)
    }

    /// Carrot with `uuid`.
    pub fn carrot(&self, uuid: &str) -> Option<&Carrot> {
        self.carrots.get(uuid)
    }

    /// Mutable carrot with `uuid`.
    pub fn carrot_mut(&mut self, uuid: &str) -> Option<&mut Carrot> {
        self.carrots.get_mut(uuid)
    }

    /// Whether `uuid` plays the farmer.
    pub fn is_farmer(&self, uuid: &str) -> bool {
        self.farmer(uuid).is_some()
    }

    /// Body of the avatar with `uuid`.
    pub fn avatar_body(&self, uuid: &str) -> Option<BodyHandle> {
        self.farmer(uuid)
            .map(|f| f.body)
            .or_else(|| self.carrot(uuid).map(|c| c.body))
    }

    /// Planting spot by id.
    pub fn planting_spot(&self, id: i32) -> Option<&PlantingSpot> {
        self.planting_spots.get(&id)
    }

    /// Baby carrot by id.
    pub fn baby(&self, id: i32) -> Option<&BabyCarrot> {
        self.babies.get(&id)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Farmer win: every carrot is rooted.
    pub fn all_carrots_rooted(&self) -> bool {
        !self.carrots.is_empty() && self.carrots.values().all(|c| c.rooted)
    }

    /// Carrot win: every baby carrot is captured.
    pub fn all_babies_captured(&self) -> bool {
        !self.babies.is_empty() && self.babies.values().all(|b| b.captured)
    }

    /// Refresh `in_wheat` for every avatar. Returns carrots whose flag changed.
    pub fn update_wheat_cover(&mut self) -> Vec<String> {
        let physics = &self.physics;
        let covered = |body: BodyHandle| {
            physics
                .position(body)
                .map(|p| !physics.sensors_containing(WHEAT_TAG, p).is_empty())
                .unwrap_or(false)
        };

        if let Some(farmer) = self.farmer.as_mut() {
            farmer.in_wheat = covered(farmer.body);
        }
        let mut changed = Vec::new();
        for carrot in self.carrots.values_mut() {
            let now = covered(carrot.body);
            if now != carrot.in_wheat {
                carrot.in_wheat = now;
                changed.push(carrot.uuid.clone());
            }
        }
        changed
    }

    /// Free planting spot whose area contains `point`.
    pub fn free_spot_at(&self, point: FixedVec2) -> Option<i32> {
        self.planting_spots
            .values()
            .find(|s| !s.carrot_planted && self.spot_contains(s, point))
            .map(|s| s.id)
    }

    /// Rooted carrot whose spot contains `point`.
    pub fn rooted_carrot_at(&self, point: FixedVec2) -> Option<(String, i32)> {
        self.carrots.values().find_map(|c| {
            let spot = self.planting_spots.get(&c.rooted_in?)?;
            self.spot_contains(spot, point).then(|| (c.uuid.clone(), spot.id))
        })
    }

    fn spot_contains(&self, spot: &PlantingSpot, point: FixedVec2) -> bool {
        self.physics
            .body(spot.body)
            .map(|b| b.position.within(point, b.radius))
            .unwrap_or(false)
    }

    /// Add a round win for `uuid`.
    pub fn award_point(&mut self, uuid: &str) {
        *self.points.entry(uuid.to_string()).or_insert(0) += 1;
    }

    // =========================================================================
    // HASHING
    // =========================================================================

    /// Digest of semantic state plus every live transform.
    ///
    /// Only logged for offline comparison; peers never exchange it.
    pub fn compute_hash(&self) -> StateHash {
        let mut h = StateHasher::for_world_state();
        h.update_u32(self.round);
        h.update_u32(self.seed as u32);
        h.update_u32((self.seed >> 32) as u32);

        if let Some(farmer) = &self.farmer {
            h.update_str(&farmer.uuid);
            h.update_i32(farmer.state.as_i32());
            h.update_bool(farmer.holding_carrot);
            h.update_bool(farmer.has_rock);
        }
        for carrot in self.carrots.values() {
            h.update_str(&carrot.uuid);
            h.update_i32(carrot.state.as_i32());
            h.update_bool(carrot.captured);
            h.update_bool(carrot.rooted);
            h.update_u32(carrot.baby_carrots);
            h.update_bool(carrot.has_rock);
        }
        for baby in self.babies.values() {
            h.update_i32(baby.id);
            h.update_bool(baby.captured);
        }
        for spot in self.planting_spots.values() {
            h.update_i32(spot.id);
            h.update_bool(spot.carrot_planted);
        }
        for spawn in self.rock_spawns.values() {
            h.update_i32(spawn.idx);
            h.update_bool(spawn.available);
        }
        for body in self.physics.bodies() {
            h.update_u32(body.handle.0);
            h.update_vec2(body.position);
            h.update_vec2(body.linear_velocity);
        }
        for (uuid, points) in &self.points {
            h.update_str(uuid);
            h.update_u32(*points);
        }
        h.finalize()
    }
}
