//! Field Layout
//!
//! Every peer builds the map independently from the round seed and the
//! ordered roster. Bodies are created in a fixed order, so body handles
//! agree across peers without ever being sent.
//!
//! ```text
//! creation order:  boundaries → planting spots → wheat → rock spawns
//!                  → baby carrots → farmer → carrots (roster order)
//! ```

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::fixed::{
    to_fixed, Fixed, AVATAR_RADIUS, BABY_RADIUS, BABY_WANDER_SPEED, BOUNDARY_RADIUS,
    FIELD_HALF_HEIGHT, FIELD_HALF_WIDTH, FIXED_ONE, PLANTING_SPOT_RADIUS, ROCK_SPAWN_RADIUS,
    WHEAT_RADIUS,
};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::entity::{BabyCarrot, Carrot, EntityRef, Farmer, PlantingSpot, RockSpawn};
use crate::game::state::SharedWorld;
use crate::physics::world::BodyDef;

const BOUNDARY_SPACING: i32 = 4;
pub(crate) const EDGE_MARGIN: Fixed = to_fixed(2.0);
const CARROT_START_X: Fixed = to_fixed(-12.0);
const FARMER_START_X: Fixed = to_fixed(12.0);

/// Map and round parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Baby carrots per round.
    pub baby_carrots: u32,
    /// Planting spots per round.
    pub planting_spots: u32,
    /// Rock spawn points.
    pub rock_spawns: u32,
    /// Wheat patches.
    pub wheat_patches: u32,
    /// Rendered frames between a win and the next round.
    pub round_over_frames: u32,
    /// Shakes a captured carrot needs to break free.
    pub free_shakes: u32,
    /// Rendered frames an avatar stays stunned by a rock.
    pub stun_frames: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            baby_carrots: 6,
            planting_spots: 4,
            rock_spawns: 3,
            wheat_patches: 5,
            round_over_frames: 180,
            free_shakes: 3,
            stun_frames: 60,
        }
    }
}

/// Build the shared world for one round.
///
/// `roster` must be the lexicographically ordered roster; `farmer` must be
/// one of its members. Everyone else plays a carrot.
pub fn generate(config: &GameConfig, roster: &[String], farmer: &str, seed: u64, round: u32) -> SharedWorld {
    let mut world = SharedWorld::new(seed, round);
    let mut rng = DeterministicRng::new(seed);

    // Posts along the field edge.
    let hw = FIELD_HALF_WIDTH / FIXED_ONE;
    let hh = FIELD_HALF_HEIGHT / FIXED_ONE;
    let mut posts = Vec::new();
    for x in (-hw..=hw).step_by(BOUNDARY_SPACING as usize) {
        posts.push(FixedVec2::from_ints(x, -hh));
        posts.push(FixedVec2::from_ints(x, hh));
    }
    for y in (-hh + BOUNDARY_SPACING..hh).step_by(BOUNDARY_SPACING as usize) {
        posts.push(FixedVec2::from_ints(-hw, y));
        posts.push(FixedVec2::from_ints(hw, y));
    }
    for pos in posts {
        let handle = world.spawn(EntityRef::Boundary, BodyDef::fixed("", pos, BOUNDARY_RADIUS));
        world.boundaries.push(handle);
    }

    for id in 0..config.planting_spots as i32 {
        let pos = rng.field_position(EDGE_MARGIN);
        let body = world.spawn(EntityRef::PlantingSpot(id), BodyDef::sensor("", pos, PLANTING_SPOT_RADIUS));
        world.planting_spots.insert(id, PlantingSpot { id, body, carrot_planted: false });
    }

    for _ in 0..config.wheat_patches {
        let pos = rng.field_position(EDGE_MARGIN);
        let handle = world.spawn(EntityRef::Wheat, BodyDef::sensor("", pos, WHEAT_RADIUS));
        world.wheat.push(handle);
    }

    for idx in 0..config.rock_spawns as i32 {
        let pos = rng.field_position(EDGE_MARGIN);
        let body = world.spawn(EntityRef::RockSpawn(idx), BodyDef::sensor("", pos, ROCK_SPAWN_RADIUS));
        world.rock_spawns.insert(idx, RockSpawn { idx, body, available: true });
    }

    for id in 0..config.baby_carrots as i32 {
        let pos = rng.field_position(EDGE_MARGIN);
        let vel = rng.velocity(BABY_WANDER_SPEED);
        let body = world.spawn(EntityRef::Baby(id), BodyDef::dynamic("", pos, BABY_RADIUS).with_velocity(vel));
        world.babies.insert(id, BabyCarrot { id, body, captured: false });
    }

    let body = world.spawn(
        EntityRef::Farmer(farmer.to_string()),
        BodyDef::dynamic("", FixedVec2::new(FARMER_START_X, 0), AVATAR_RADIUS),
    );
    world.farmer = Some(Farmer::new(farmer, body));

    let carrots: Vec<&String> = roster.iter().filter(|uuid| uuid.as_str() != farmer).collect();
    let lanes = carrots.len() as i32 + 1;
    for (i, uuid) in carrots.into_iter().enumerate() {
        let y = -FIELD_HALF_HEIGHT + (2 * FIELD_HALF_HEIGHT / lanes) * (i as i32 + 1);
        let body = world.spawn(
            EntityRef::Carrot(uuid.clone()),
            BodyDef::dynamic("", FixedVec2::new(CARROT_START_X, y), AVATAR_RADIUS),
        );
        world.carrots.insert(uuid.clone(), Carrot::new(uuid.clone(), body));
    }

    info!(
        "Round {} map: farmer {}, {} carrots, {} bodies",
        round,
        farmer,
        world.carrots.len(),
        world.physics.len()
    );
    world
}
