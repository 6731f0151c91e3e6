//! Configuration
//!
//! One JSON document covers every tunable. Missing sections and fields fall
//! back to their defaults, so `{}` is a valid configuration.
//!
//! ```json
//! {
//!   "session":   { "min_players": 2, "max_players": 6 },
//!   "tick":      { "tick_rate": 60, "max_steps_per_frame": 5 },
//!   "ownership": { "snapshot_cadence_ticks": 3 },
//!   "reducer":   { "filter_self_echo": false, "optimistic_local_apply": true },
//!   "game":      { "baby_carrots": 6, "round_over_frames": 180 }
//! }
//! ```

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;

use crate::game::map::GameConfig;
use crate::game::reducer::ReducerOptions;
use crate::game::tick::LoopConfig;
use crate::network::session::SessionConfig;
use crate::sync::ownership::OwnershipConfig;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid JSON or field types.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Every tunable of a peer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Room size limits.
    pub session: SessionConfig,
    /// Loop timing.
    pub tick: LoopConfig,
    /// Snapshot cadence.
    pub ownership: OwnershipConfig,
    /// Reducer switches.
    pub reducer: ReducerOptions,
    /// Map and round parameters.
    pub game: GameConfig,
}

impl SyncConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SyncConfig::from_json_str("{}").unwrap();
        assert_eq!(config.session.min_players, 2);
        assert_eq!(config.tick.tick_rate, crate::TICK_RATE);
        assert_eq!(config.ownership.snapshot_cadence_ticks, 3);
        assert!(!config.reducer.filter_self_echo);
        assert!(config.reducer.optimistic_local_apply);
        assert_eq!(config.game.baby_carrots, 6);
    }

    #[test]
    fn test_partial_sections() {
        let config = SyncConfig::from_json_str(
            r#"{ "reducer": { "filter_self_echo": true }, "game": { "baby_carrots": 2 } }"#,
        )
        .unwrap();
        assert!(config.reducer.filter_self_echo);
        assert!(config.reducer.optimistic_local_apply);
        assert_eq!(config.game.baby_carrots, 2);
        assert_eq!(config.game.planting_spots, 4);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(SyncConfig::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            SyncConfig::from_json_str(r#"{ "tick": { "tick_rate": "fast" } }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(SyncConfig::load("/nonexistent/rooted.json"), Err(ConfigError::Io(_))));
    }
}
