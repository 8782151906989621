use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;
use topica_core::{DEFAULT_PAGE_LIMIT, NEW_TOPIC_ID_PREFIX, engine::EngineOptions};

///
/// ConfigError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("default_page_limit must be positive")]
    InvalidPageLimit,

    #[error("cannot read config file '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("new_topic_prefix '{found}' does not match the engine prefix '{expected}'")]
    PrefixMismatch { expected: String, found: String },
}

///
/// EngineConfig
///
/// Host-level engine settings, usually read from a TOML file:
///
/// ```toml
/// default_page_limit = 50
/// read_only = false
/// new_topic_prefix = "_"
/// ```
///
/// `new_topic_prefix` is a check only; the prefix is fixed by the engine and
/// a config naming another one is rejected.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub default_page_limit: usize,
    pub read_only: bool,
    pub new_topic_prefix: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_PAGE_LIMIT,
            read_only: false,
            new_topic_prefix: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let source = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_limit == 0 {
            return Err(ConfigError::InvalidPageLimit);
        }

        match &self.new_topic_prefix {
            Some(prefix) if prefix != NEW_TOPIC_ID_PREFIX => Err(ConfigError::PrefixMismatch {
                expected: NEW_TOPIC_ID_PREFIX.to_string(),
                found: prefix.clone(),
            }),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub const fn options(&self) -> EngineOptions {
        EngineOptions {
            default_page_limit: self.default_page_limit,
            read_only: self.read_only,
        }
    }
}

///
/// TESTS
///
