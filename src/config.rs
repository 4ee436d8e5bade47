//! Event store configuration
//!
//! Loaded from a JSON file. Every field has a default, so an empty object
//! is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{CodecVersion, DEFAULT_MASK_TOKEN, DEFAULT_MAX_RAW_EVENT_BYTES};
use crate::log::TrustLevel;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Event store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Offset overwrite policy (default: 0, strict)
    #[serde(default)]
    pub trust_level: TrustLevel,

    /// Version written by encoders (default: latest). Readers accept all.
    #[serde(default)]
    pub codec_version: CodecVersion,

    /// Idle read buffers kept by the pool (default: 64)
    #[serde(default = "default_buffer_pool_capacity")]
    pub buffer_pool_capacity: usize,

    /// Replaces string values of unlogged arguments (default: "*")
    #[serde(default = "default_mask_token")]
    pub mask_token: String,

    /// Raw input kept for invalid events (default: 65535 bytes)
    #[serde(default = "default_max_raw_event_bytes")]
    pub max_raw_event_bytes: usize,
}

fn default_buffer_pool_capacity() -> usize {
    64
}

fn default_mask_token() -> String {
    DEFAULT_MASK_TOKEN.to_string()
}

fn default_max_raw_event_bytes() -> usize {
    DEFAULT_MAX_RAW_EVENT_BYTES
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            trust_level: TrustLevel::default(),
            codec_version: CodecVersion::default(),
            buffer_pool_capacity: default_buffer_pool_capacity(),
            mask_token: default_mask_token(),
            max_raw_event_bytes: default_max_raw_event_bytes(),
        }
    }
}

impl StoreConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_trust_level(mut self, trust_level: TrustLevel) -> Self {
        self.trust_level = trust_level;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mask_token.is_empty() {
            return Err(ConfigError::Invalid("mask_token must not be empty".into()));
        }
        if self.mask_token.len() > u16::MAX as usize {
            return Err(ConfigError::Invalid("mask_token is too long".into()));
        }
        if self.max_raw_event_bytes > u32::MAX as usize {
            return Err(ConfigError::Invalid(
                "max_raw_event_bytes must fit in 32 bits".into(),
            ));
        }
        Ok(())
    }
}
