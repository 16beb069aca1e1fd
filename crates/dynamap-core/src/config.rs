//! Connection configuration.
//!
//! Loaded by the application (credential loading is its concern) and handed
//! to the connection manager, which passes it to the connector and applies
//! per-table cache settings when binding table handles.

use crate::error::{Error, ErrorClass, ErrorOrigin};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, time::Duration};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),

    #[error("table '{table}': cache prefix must not be empty")]
    EmptyCachePrefix { table: String },

    #[error("{scope}: cache ttl must be greater than zero")]
    ZeroCacheTtl { scope: String },

    #[error("no store connector configured")]
    MissingConnector,
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Validation, ErrorOrigin::Config, err.to_string())
    }
}

///
/// Credentials
///
/// Opaque to this crate; only the connector interprets them.
///

#[derive(Clone, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

///
/// ConnectionConfig
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub credentials: Credentials,

    /// Store endpoint override; `None` lets the connector pick.
    pub endpoint: Option<String>,

    /// TTL for cache writes on tables that set none themselves.
    /// `None` disables write-through for those tables.
    pub default_cache_ttl_secs: Option<u64>,

    /// Per-table overrides, keyed by table name.
    pub tables: BTreeMap<String, TableConfig>,
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_default_cache_ttl(mut self, ttl: Duration) -> Self {
        self.default_cache_ttl_secs = Some(ttl.as_secs());
        self
    }

    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: TableConfig) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_cache_ttl_secs == Some(0) {
            return Err(ConfigError::ZeroCacheTtl {
                scope: "default".to_string(),
            });
        }

        for (name, table) in &self.tables {
            if table.cache_prefix.as_deref().is_some_and(str::is_empty) {
                return Err(ConfigError::EmptyCachePrefix {
                    table: name.clone(),
                });
            }
            if table.cache_ttl_secs == Some(0) {
                return Err(ConfigError::ZeroCacheTtl {
                    scope: format!("table '{name}'"),
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.get(name)
    }

    #[must_use]
    pub fn default_cache_ttl(&self) -> Option<Duration> {
        self.default_cache_ttl_secs.map(Duration::from_secs)
    }
}

///
/// TableConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct TableConfig {
    pub cache_ttl_secs: Option<u64>,
    pub cache_prefix: Option<String>,
}

impl TableConfig {
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

///
/// TESTS
///
