//! Event Registry
//!
//! Maps a wire tag to the decoder for its kind. A kind has to be attached
//! before it can be sent or received; unattached tags are treated exactly
//! like unknown ones.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::network::codec::{DecodeError, WireReader, WireWriter};
use crate::network::events::{
    GameEvent, WireEvent,
    CaptureEvent, RootEvent, UnrootEvent, MoveEvent, CaptureBarrotEvent, FreeEvent,
    SpawnRockEvent, CollectedRockEvent, ResetEvent, ReadyEvent, RustleEvent, DashEvent,
};

type DecodeFn = fn(&mut WireReader<'_>) -> Result<GameEvent, DecodeError>;

/// Errors raised when encoding through the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The event's kind was never attached.
    #[error("event type {name} (tag {tag}) is not attached")]
    NotAttached {
        /// Wire tag.
        tag: u8,
        /// Kind name.
        name: &'static str,
    },

    /// A string field exceeded `MAX_STRING_LEN`.
    #[error("string field of {0} bytes exceeds limit")]
    StringTooLong(usize),
}

#[derive(Clone, Copy)]
struct RegisteredKind {
    name: &'static str,
    decode: DecodeFn,
}

/// Blank-instance factory: start from `T::default()` and rehydrate.
fn decode_as<T: WireEvent>(r: &mut WireReader<'_>) -> Result<GameEvent, DecodeError> {
    let mut event = T::default();
    event.read_fields(r)?;
    Ok(event.into())
}

/// Tag → decoder table.
#[derive(Clone, Default)]
pub struct EventRegistry {
    kinds: BTreeMap<u8, RegisteredKind>,
}

impl EventRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every game event kind attached.
    pub fn with_game_events() -> Self {
        let mut registry = Self::new();
        registry.attach_game_events();
        registry
    }

    /// Attach every game event kind.
    pub fn attach_game_events(&mut self) {
        self.attach_event_type::<CaptureEvent>();
        self.attach_event_type::<RootEvent>();
        self.attach_event_type::<UnrootEvent>();
        self.attach_event_type::<MoveEvent>();
        self.attach_event_type::<CaptureBarrotEvent>();
        self.attach_event_type::<FreeEvent>();
        self.attach_event_type::<SpawnRockEvent>();
        self.attach_event_type::<CollectedRockEvent>();
        self.attach_event_type::<ResetEvent>();
        self.attach_event_type::<ReadyEvent>();
        self.attach_event_type::<RustleEvent>();
        self.attach_event_type::<DashEvent>();
    }

    /// Register kind `T` under its tag. Re-attaching is a no-op.
    pub fn attach_event_type<T: WireEvent>(&mut self) {
        if self.kinds.contains_key(&T::TAG) {
            return;
        }
        debug!("Attached event type {} (tag {})", T::NAME, T::TAG);
        self.kinds.insert(T::TAG, RegisteredKind {
            name: T::NAME,
            decode: decode_as::<T>,
        });
    }

    /// Whether a tag has been attached.
    pub fn is_attached(&self, tag: u8) -> bool {
        self.kinds.contains_key(&tag)
    }

    /// Number of attached kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kinds are attached.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Encode `[tag][fields]`.
    pub fn encode(&self, event: &GameEvent) -> Result<Vec<u8>, RegistryError> {
        let tag = event.tag();
        if !self.is_attached(tag) {
            return Err(RegistryError::NotAttached { tag, name: event.name() });
        }
        let mut w = WireWriter::new();
        w.write_u8(tag);
        event.write_fields(&mut w);
        if let Some(len) = w.oversized() {
            return Err(RegistryError::StringTooLong(len));
        }
        Ok(w.into_bytes())
    }

    /// Decode the fields for `tag` from `payload`, which must be consumed entirely.
    pub fn decode(&self, tag: u8, payload: &[u8]) -> Result<GameEvent, DecodeError> {
        let kind = self.kinds.get(&tag).ok_or(DecodeError::UnknownTag(tag))?;
        let mut reader = WireReader::new(payload);
        let event = (kind.decode)(&mut reader)?;
        reader.finish()?;
        Ok(event)
    }

    /// Decode a buffer produced by [`EventRegistry::encode`].
    pub fn decode_tagged(&self, bytes: &[u8]) -> Result<GameEvent, DecodeError> {
        let (&tag, payload) = bytes.split_first().ok_or(DecodeError::EmptyPacket)?;
        self.decode(tag, payload)
    }

    /// Kind name for a tag, if attached.
    pub fn name_of(&self, tag: u8) -> Option<&'static str> {
        self.kinds.get(&tag).map(|k| k.name)
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.kinds.iter().map(|(tag, kind)| (tag, kind.name)))
            .finish()
    }
}
