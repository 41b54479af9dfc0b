//! Configuration loading and representation.

use thiserror::Error;

use patchlog_events::ENVELOPE_SCHEMA_VERSION;

use crate::datastore::Key;

pub const ENV_BASE_KEY: &str = "PATCHLOG_BASE_KEY";
pub const ENV_VERIFY_CID: &str = "PATCHLOG_VERIFY_CID";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a boolean (true/false/1/0), got '{value}'")]
    InvalidBool { var: &'static str, value: String },
}

/// JSON patcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatcherConfig {
    /// Prefix under which entities are materialized (`base / model / id`).
    pub base_key: Key,
    /// Check envelope digests before decoding them.
    pub verify_content_id: bool,
    /// Envelope schema version to write and accept.
    pub schema_version: u32,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            base_key: Key::root(),
            verify_content_id: true,
            schema_version: ENVELOPE_SCHEMA_VERSION,
        }
    }
}

impl PatcherConfig {
    /// Defaults overridden by `PATCHLOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`PatcherConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base) = lookup(ENV_BASE_KEY) {
            config.base_key = Key::new(base);
        }
        if let Some(value) = lookup(ENV_VERIFY_CID) {
            config.verify_content_id = parse_bool(ENV_VERIFY_CID, &value)?;
        }

        Ok(config)
    }

    pub fn with_base_key(mut self, base_key: impl Into<Key>) -> Self {
        self.base_key = base_key.into();
        self
    }

    pub fn with_verify_content_id(mut self, verify: bool) -> Self {
        self.verify_content_id = verify;
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}
