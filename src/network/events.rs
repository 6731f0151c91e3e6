//! Game Events
//!
//! One struct per event kind plus the `GameEvent` sum type the reducer
//! matches on. Each kind knows its wire tag and writes its fields in
//! declaration order; decoding starts from the kind's `Default` (the blank
//! instance) and reads the same fields back.
//!
//! | Tag | Kind          | Fields                                   |
//! |-----|---------------|------------------------------------------|
//! | 1   | Capture       | uuid                                     |
//! | 2   | Root          | uuid, planting_spot_id                   |
//! | 3   | Unroot        | uuid, planting_spot_id                   |
//! | 4   | Move          | uuid, state                              |
//! | 5   | CaptureBarrot | carrot_uuid, barrot_id                   |
//! | 6   | Free          | uuid                                     |
//! | 7   | SpawnRock     | pos, idx, vel, uuid                      |
//! | 8   | CollectedRock | uuid, rock_id                            |
//! | 9   | Reset         | kind                                     |
//! | 10  | Ready         | kind                                     |
//! | 11  | Rustle        | uuid, is_moving                          |
//! | 12  | Dash          | uuid                                     |

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::entity::EntityState;
use crate::network::codec::{DecodeError, WireReader, WireWriter};

/// A kind of event that can travel over the wire.
pub trait WireEvent: Default + Into<GameEvent> {
    /// Stable wire tag.
    const TAG: u8;
    /// Human-readable kind name for logs.
    const NAME: &'static str;

    /// Write fields in declaration order.
    fn write_fields(&self, w: &mut WireWriter);

    /// Populate a blank instance from the wire, same order as `write_fields`.
    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError>;
}

// =============================================================================
// RESET KIND
// =============================================================================

/// What a `Reset` (or `Ready`) refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResetKind {
    /// New round: regenerate the map, keep points.
    #[default]
    Round = 0,
    /// New game: regenerate the map and zero points.
    Game = 1,
}

impl ResetKind {
    /// Parse a wire value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Round),
            1 => Some(Self::Game),
            _ => None,
        }
    }
}

fn read_reset_kind(r: &mut WireReader<'_>) -> Result<ResetKind, DecodeError> {
    let value = r.read_i32()?;
    ResetKind::from_i32(value).ok_or(DecodeError::InvalidEnumValue { kind: "ResetKind", value })
}

// =============================================================================
// EVENT KINDS
// =============================================================================

/// The farmer caught a carrot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureEvent {
    /// Carrot UUID.
    pub uuid: String,
}

/// The farmer planted a carrot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootEvent {
    /// Carrot UUID.
    pub uuid: String,
    /// Planting spot id.
    pub planting_spot_id: i32,
}

/// A carrot was pulled out of a planting spot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnrootEvent {
    /// Carrot UUID.
    pub uuid: String,
    /// Planting spot id.
    pub planting_spot_id: i32,
}

/// An avatar changed animation state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveEvent {
    /// Avatar UUID.
    pub uuid: String,
    /// New state.
    pub state: EntityState,
}

/// A carrot collected a baby carrot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureBarrotEvent {
    /// Collecting carrot UUID.
    pub carrot_uuid: String,
    /// Baby carrot id.
    pub barrot_id: i32,
}

/// A captured carrot broke free.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FreeEvent {
    /// Carrot UUID.
    pub uuid: String,
}

/// A rock was thrown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpawnRockEvent {
    /// Launch position.
    pub pos: FixedVec2,
    /// Rock spawn index the rock was picked up from.
    pub idx: i32,
    /// Launch velocity.
    pub vel: FixedVec2,
    /// Thrower UUID.
    pub uuid: String,
}

/// An avatar picked up a rock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectedRockEvent {
    /// Avatar UUID.
    pub uuid: String,
    /// Rock spawn index.
    pub rock_id: i32,
}

/// Start a new round or game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetEvent {
    /// Round or game.
    pub kind: ResetKind,
}

/// The sender is ready for a reset of the given kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadyEvent {
    /// Round or game.
    pub kind: ResetKind,
}

/// Wheat around a carrot started or stopped rustling.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RustleEvent {
    /// Carrot UUID.
    pub uuid: String,
    /// Carrot is moving through wheat.
    pub is_moving: bool,
}

/// An avatar dashed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashEvent {
    /// Avatar UUID.
    pub uuid: String,
}

// =============================================================================
// WIRE IMPLEMENTATIONS
// =============================================================================

impl WireEvent for CaptureEvent {
    const TAG: u8 = 1;
    const NAME: &'static str = "Capture";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        Ok(())
    }
}

impl WireEvent for RootEvent {
    const TAG: u8 = 2;
    const NAME: &'static str = "Root";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
        w.write_i32(self.planting_spot_id);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        self.planting_spot_id = r.read_i32()?;
        Ok(())
    }
}

impl WireEvent for UnrootEvent {
    const TAG: u8 = 3;
    const NAME: &'static str = "Unroot";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
        w.write_i32(self.planting_spot_id);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        self.planting_spot_id = r.read_i32()?;
        Ok(())
    }
}

impl WireEvent for MoveEvent {
    const TAG: u8 = 4;
    const NAME: &'static str = "Move";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
        w.write_i32(self.state.as_i32());
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        let value = r.read_i32()?;
        self.state = EntityState::from_i32(value)
            .ok_or(DecodeError::InvalidEnumValue { kind: "EntityState", value })?;
        Ok(())
    }
}

impl WireEvent for CaptureBarrotEvent {
    const TAG: u8 = 5;
    const NAME: &'static str = "CaptureBarrot";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.carrot_uuid);
        w.write_i32(self.barrot_id);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.carrot_uuid = r.read_string()?;
        self.barrot_id = r.read_i32()?;
        Ok(())
    }
}

impl WireEvent for FreeEvent {
    const TAG: u8 = 6;
    const NAME: &'static str = "Free";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        Ok(())
    }
}

impl WireEvent for SpawnRockEvent {
    const TAG: u8 = 7;
    const NAME: &'static str = "SpawnRock";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_vec2(self.pos);
        w.write_i32(self.idx);
        w.write_vec2(self.vel);
        w.write_string(&self.uuid);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.pos = r.read_vec2()?;
        self.idx = r.read_i32()?;
        self.vel = r.read_vec2()?;
        self.uuid = r.read_string()?;
        Ok(())
    }
}

impl WireEvent for CollectedRockEvent {
    const TAG: u8 = 8;
    const NAME: &'static str = "CollectedRock";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
        w.write_i32(self.rock_id);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        self.rock_id = r.read_i32()?;
        Ok(())
    }
}

impl WireEvent for ResetEvent {
    const TAG: u8 = 9;
    const NAME: &'static str = "Reset";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_i32(self.kind as i32);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.kind = read_reset_kind(r)?;
        Ok(())
    }
}

impl WireEvent for ReadyEvent {
    const TAG: u8 = 10;
    const NAME: &'static str = "Ready";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_i32(self.kind as i32);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.kind = read_reset_kind(r)?;
        Ok(())
    }
}

impl WireEvent for RustleEvent {
    const TAG: u8 = 11;
    const NAME: &'static str = "Rustle";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
        w.write_bool(self.is_moving);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        self.is_moving = r.read_bool()?;
        Ok(())
    }
}

impl WireEvent for DashEvent {
    const TAG: u8 = 12;
    const NAME: &'static str = "Dash";

    fn write_fields(&self, w: &mut WireWriter) {
        w.write_string(&self.uuid);
    }

    fn read_fields(&mut self, r: &mut WireReader<'_>) -> Result<(), DecodeError> {
        self.uuid = r.read_string()?;
        Ok(())
    }
}

// =============================================================================
// SUM TYPE
// =============================================================================

/// Every event kind the game exchanges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// See [`CaptureEvent`].
    Capture(CaptureEvent),
    /// See [`RootEvent`].
    Root(RootEvent),
    /// See [`UnrootEvent`].
    Unroot(UnrootEvent),
    /// See [`MoveEvent`].
    Move(MoveEvent),
    /// See [`CaptureBarrotEvent`].
    CaptureBarrot(CaptureBarrotEvent),
    /// See [`FreeEvent`].
    Free(FreeEvent),
    /// See [`SpawnRockEvent`].
    SpawnRock(SpawnRockEvent),
    /// See [`CollectedRockEvent`].
    CollectedRock(CollectedRockEvent),
    /// See [`ResetEvent`].
    Reset(ResetEvent),
    /// See [`ReadyEvent`].
    Ready(ReadyEvent),
    /// See [`RustleEvent`].
    Rustle(RustleEvent),
    /// See [`DashEvent`].
    Dash(DashEvent),
}

macro_rules! impl_into_game_event {
    ($($kind:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$kind> for GameEvent {
                fn from(event: $kind) -> Self {
                    GameEvent::$variant(event)
                }
            }
        )*
    };
}

impl_into_game_event! {
    CaptureEvent => Capture,
    RootEvent => Root,
    UnrootEvent => Unroot,
    MoveEvent => Move,
    CaptureBarrotEvent => CaptureBarrot,
    FreeEvent => Free,
    SpawnRockEvent => SpawnRock,
    CollectedRockEvent => CollectedRock,
    ResetEvent => Reset,
    ReadyEvent => Ready,
    RustleEvent => Rustle,
    DashEvent => Dash,
}

impl GameEvent {
    /// Wire tag of this event's kind.
    pub fn tag(&self) -> u8 {
        match self {
            GameEvent::Capture(_) => CaptureEvent::TAG,
            GameEvent::Root(_) => RootEvent::TAG,
            GameEvent::Unroot(_) => UnrootEvent::TAG,
            GameEvent::Move(_) => MoveEvent::TAG,
            GameEvent::CaptureBarrot(_) => CaptureBarrotEvent::TAG,
            GameEvent::Free(_) => FreeEvent::TAG,
            GameEvent::SpawnRock(_) => SpawnRockEvent::TAG,
            GameEvent::CollectedRock(_) => CollectedRockEvent::TAG,
            GameEvent::Reset(_) => ResetEvent::TAG,
            GameEvent::Ready(_) => ReadyEvent::TAG,
            GameEvent::Rustle(_) => RustleEvent::TAG,
            GameEvent::Dash(_) => DashEvent::TAG,
        }
    }

    /// Kind name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Capture(_) => CaptureEvent::NAME,
            GameEvent::Root(_) => RootEvent::NAME,
            GameEvent::Unroot(_) => UnrootEvent::NAME,
            GameEvent::Move(_) => MoveEvent::NAME,
            GameEvent::CaptureBarrot(_) => CaptureBarrotEvent::NAME,
            GameEvent::Free(_) => FreeEvent::NAME,
            GameEvent::SpawnRock(_) => SpawnRockEvent::NAME,
            GameEvent::CollectedRock(_) => CollectedRockEvent::NAME,
            GameEvent::Reset(_) => ResetEvent::NAME,
            GameEvent::Ready(_) => ReadyEvent::NAME,
            GameEvent::Rustle(_) => RustleEvent::NAME,
            GameEvent::Dash(_) => DashEvent::NAME,
        }
    }

    /// Write the fields of the wrapped kind (no tag).
    pub fn write_fields(&self, w: &mut WireWriter) {
        match self {
            GameEvent::Capture(e) => e.write_fields(w),
            GameEvent::Root(e) => e.write_fields(w),
            GameEvent::Unroot(e) => e.write_fields(w),
            GameEvent::Move(e) => e.write_fields(w),
            GameEvent::CaptureBarrot(e) => e.write_fields(w),
            GameEvent::Free(e) => e.write_fields(w),
            GameEvent::SpawnRock(e) => e.write_fields(w),
            GameEvent::CollectedRock(e) => e.write_fields(w),
            GameEvent::Reset(e) => e.write_fields(w),
            GameEvent::Ready(e) => e.write_fields(w),
            GameEvent::Rustle(e) => e.write_fields(w),
            GameEvent::Dash(e) => e.write_fields(w),
        }
    }

    /// Kinds the originating peer applies to its own world before sending.
    ///
    /// `Move` relies on its uuid self-filter instead; `Reset` and `Ready`
    /// only take effect through the inbound queue.
    pub fn applies_optimistically(&self) -> bool {
        !matches!(self, GameEvent::Move(_) | GameEvent::Reset(_) | GameEvent::Ready(_))
    }
}
