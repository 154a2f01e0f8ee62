//! User configuration, read from `{config_dir}/recall/config.toml`.
//!
//! ```toml
//! deck = "/home/me/cards/spanish.json"
//! history_capacity = 20
//! checkpoint_every = 5
//! session_limit = 50
//! rating_scale = "four-point"   # or "sm2"
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::RatingScale;
use crate::history::DEFAULT_CAPACITY;

const APP_DIR: &str = "recall";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("No data directory available; pass --deck")]
    DataDirNotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Deck file; defaults to `{data_local_dir}/recall/deck.json`
    pub deck: Option<PathBuf>,
    /// Undo steps kept per deck
    pub history_capacity: usize,
    /// Save after this many reviewed cards during a session
    pub checkpoint_every: usize,
    /// Default cap on cards per session
    pub session_limit: Option<usize>,
    pub rating_scale: RatingScale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deck: None,
            history_capacity: DEFAULT_CAPACITY,
            checkpoint_every: 5,
            session_limit: None,
            rating_scale: RatingScale::default(),
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;

        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from the default location, or defaults if there is none
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity must be at least 1"));
        }
        if self.checkpoint_every == 0 {
            return Err(invalid("checkpoint_every must be at least 1"));
        }
        if self.session_limit == Some(0) {
            return Err(invalid("session_limit must be at least 1"));
        }
        Ok(())
    }

    /// The deck file to use: the configured one, else the default
    pub fn deck_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(deck) = &self.deck {
            return Ok(deck.clone());
        }
        dirs::data_local_dir()
            .map(|p| p.join(APP_DIR).join("deck.json"))
            .ok_or(ConfigError::DataDirNotFound)
    }
}
