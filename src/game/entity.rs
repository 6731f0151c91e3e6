//! Shared Entities
//!
//! The semantic half of every shared object. The physical half (position,
//! velocity) lives in the obstacle world and is reached through `body`.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::physics::world::BodyHandle;

// =============================================================================
// ENTITY STATE
// =============================================================================

/// Animation / behaviour state of an avatar, carried by `Move` events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EntityState {
    /// Idle.
    #[default]
    Standing = 0,
    /// Slow, quiet movement.
    Sneaking = 1,
    /// Normal movement.
    Walking = 2,
    /// Fast movement.
    Running = 3,
    /// Dash burst.
    Dashing = 4,
    /// Hit by a rock.
    Stunned = 5,
    /// Farmer carrying a captured carrot.
    Carrying = 6,
    /// Farmer planting a carrot.
    Rooting = 7,
    /// Carrot held by the farmer.
    Caught = 8,
    /// Carrot planted in a spot.
    Rooted = 9,
    /// Carrot pulling another carrot out.
    Unrooting = 10,
}

impl EntityState {
    /// Wire discriminant.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Parse a wire discriminant.
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Standing,
            1 => Self::Sneaking,
            2 => Self::Walking,
            3 => Self::Running,
            4 => Self::Dashing,
            5 => Self::Stunned,
            6 => Self::Carrying,
            7 => Self::Rooting,
            8 => Self::Caught,
            9 => Self::Rooted,
            10 => Self::Unrooting,
            _ => return None,
        })
    }

    /// States in which local input may move the avatar.
    pub fn can_move(self) -> bool {
        !matches!(self, Self::Caught | Self::Rooted | Self::Stunned)
    }
}

// =============================================================================
// BODY TAGS
// =============================================================================

/// Farmer body tag.
pub const FARMER_TAG: &str = "farmer";
/// Carrot body tag.
pub const CARROT_TAG: &str = "carrot";
/// Baby carrot body tag.
pub const BABY_TAG: &str = "baby";
/// Planting spot body tag.
pub const PLANTING_SPOT_TAG: &str = "planting spot";
/// Rock spawn body tag.
pub const ROCK_SPAWN_TAG: &str = "rock_spawn";
/// Thrown rock body tag.
pub const ROCK_TAG: &str = "rock";
/// Wheat patch body tag.
pub const WHEAT_TAG: &str = "wheat";
/// Boundary body tag.
pub const BOUNDARY_TAG: &str = "boundary";

// =============================================================================
// DRAW ORDER
// =============================================================================

/// Default draw priority of the farmer.
pub const FARMER_DRAW_PRIORITY: i32 = 20;

/// Default draw priority of a carrot.
pub const CARROT_DRAW_PRIORITY: i32 = 10;

// =============================================================================
// AVATARS
// =============================================================================

/// The single farmer avatar.
#[derive(Clone, Debug)]
pub struct Farmer {
    /// Peer UUID controlling this avatar.
    pub uuid: String,
    /// Obstacle world body.
    pub body: BodyHandle,
    /// Current state.
    pub state: EntityState,
    /// Holding a captured carrot.
    pub holding_carrot: bool,
    /// UUID of the carrot being held.
    pub held_carrot: Option<String>,
    /// Holding a rock picked up from a spawn.
    pub has_rock: bool,
    /// Spawn index the held rock came from.
    pub rock_from: Option<i32>,
    /// Inside a wheat patch.
    pub in_wheat: bool,
    /// Frames left stunned by a rock.
    pub stun_frames: u32,
    /// Render priority.
    pub draw_priority: i32,
}

impl Farmer {
    /// New farmer bound to `body`.
    pub fn new(uuid: impl Into<String>, body: BodyHandle) -> Self {
        Self {
            uuid: uuid.into(),
            body,
            state: EntityState::Standing,
            holding_carrot: false,
            held_carrot: None,
            has_rock: false,
            rock_from: None,
            in_wheat: false,
            stun_frames: 0,
            draw_priority: FARMER_DRAW_PRIORITY,
        }
    }

    /// Whether the farmer is holding a carrot.
    pub fn is_holding_carrot(&self) -> bool {
        self.holding_carrot
    }
}

/// A carrot avatar (one per non-farmer peer).
#[derive(Clone, Debug)]
pub struct Carrot {
    /// Peer UUID controlling this avatar.
    pub uuid: String,
    /// Obstacle world body.
    pub body: BodyHandle,
    /// Current state.
    pub state: EntityState,
    /// Held by the farmer.
    pub captured: bool,
    /// Planted in a spot.
    pub rooted: bool,
    /// Planting spot id when rooted.
    pub rooted_in: Option<i32>,
    /// Baby carrots collected this round.
    pub baby_carrots: u32,
    /// Holding a rock.
    pub has_rock: bool,
    /// Spawn index the held rock came from.
    pub rock_from: Option<i32>,
    /// Wheat is rustling around this carrot.
    pub rustling: bool,
    /// Inside a wheat patch.
    pub in_wheat: bool,
    /// Frames left stunned by a rock.
    pub stun_frames: u32,
    /// Shakes performed while captured.
    pub shakes: u32,
    /// Render priority.
    pub draw_priority: i32,
}

impl Carrot {
    /// New carrot bound to `body`.
    pub fn new(uuid: impl Into<String>, body: BodyHandle) -> Self {
        Self {
            uuid: uuid.into(),
            body,
            state: EntityState::Standing,
            captured: false,
            rooted: false,
            rooted_in: None,
            baby_carrots: 0,
            has_rock: false,
            rock_from: None,
            rustling: false,
            in_wheat: false,
            stun_frames: 0,
            shakes: 0,
            draw_priority: CARROT_DRAW_PRIORITY,
        }
    }

    /// Whether the farmer currently holds this carrot.
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Whether this carrot is planted.
    pub fn is_rooted(&self) -> bool {
        self.rooted
    }
}

// =============================================================================
// FIELD OBJECTS
// =============================================================================

/// A baby carrot ("barrot") for carrots to collect.
#[derive(Clone, Debug)]
pub struct BabyCarrot {
    /// Stable id (creation order).
    pub id: i32,
    /// Obstacle world body.
    pub body: BodyHandle,
    /// Collected by a carrot.
    pub captured: bool,
}

/// A spot the farmer roots carrots into.
#[derive(Clone, Debug)]
pub struct PlantingSpot {
    /// Stable id (creation order).
    pub id: i32,
    /// Obstacle world body (sensor).
    pub body: BodyHandle,
    /// Occupied.
    pub carrot_planted: bool,
}

/// A point where rocks can be picked up.
#[derive(Clone, Debug)]
pub struct RockSpawn {
    /// Stable index.
    pub idx: i32,
    /// Obstacle world body (sensor).
    pub body: BodyHandle,
    /// A rock is waiting here.
    pub available: bool,
}

/// Fixed steps a thrown rock flies before it stops and is removed.
pub const ROCK_FLIGHT_TICKS: u32 = 45;

/// A rock in flight.
#[derive(Clone, Debug)]
pub struct ThrownRock {
    /// Obstacle world body.
    pub body: BodyHandle,
    /// UUID of the thrower.
    pub thrower: String,
    /// Velocity at launch.
    pub launch_velocity: FixedVec2,
    /// Fixed steps flown so far.
    pub age: u32,
}

impl ThrownRock {
    /// A rock just launched with `velocity`.
    pub fn new(body: BodyHandle, thrower: impl Into<String>, velocity: FixedVec2) -> Self {
        Self { body, thrower: thrower.into(), launch_velocity: velocity, age: 0 }
    }

    /// Whether the rock has slowed to a stop.
    pub fn stopped(&self) -> bool {
        self.age >= ROCK_FLIGHT_TICKS
    }
}

/// What a body in the obstacle world stands for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityRef {
    /// The farmer avatar.
    Farmer(String),
    /// A carrot avatar.
    Carrot(String),
    /// A baby carrot by id.
    Baby(i32),
    /// A planting spot by id.
    PlantingSpot(i32),
    /// A rock spawn by index.
    RockSpawn(i32),
    /// A rock in flight.
    Rock,
    /// A wheat patch.
    Wheat,
    /// A boundary post.
    Boundary,
}

impl EntityRef {
    /// User-data tag of bodies of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            EntityRef::Farmer(_) => FARMER_TAG,
            EntityRef::Carrot(_) => CARROT_TAG,
            EntityRef::Baby(_) => BABY_TAG,
            EntityRef::PlantingSpot(_) => PLANTING_SPOT_TAG,
            EntityRef::RockSpawn(_) => ROCK_SPAWN_TAG,
            EntityRef::Rock => ROCK_TAG,
            EntityRef::Wheat => WHEAT_TAG,
            EntityRef::Boundary => BOUNDARY_TAG,
        }
    }

    /// Whether this is a player avatar.
    pub fn is_avatar(&self) -> bool {
        matches!(self, EntityRef::Farmer(_) | EntityRef::Carrot(_))
    }
}
