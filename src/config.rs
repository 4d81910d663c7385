use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "rules/";
pub const DEFAULT_ALIAS_KEY: &str = "rules/loyalty-discount-rules-latest.xlsx";
pub const DEFAULT_POLL_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid reload configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

/// Where rule documents live and how often to look for new ones.
///
/// Loaded from TOML, either as a `[rules]` table or as a bare table:
///
/// ```toml
/// [rules]
/// bucket = "loyalty-config"
/// prefix = "rules/"
/// alias_key = "rules/loyalty-discount-rules-latest.xlsx"
/// poll_ms = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReloadConfig {
    /// Bucket or container the store adapter binds to.
    pub bucket: String,
    /// Key prefix candidate documents are uploaded under.
    pub prefix: String,
    /// Stable key the newest candidate is promoted to.
    pub alias_key: String,
    pub poll_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: DEFAULT_PREFIX.to_owned(),
            alias_key: DEFAULT_ALIAS_KEY.to_owned(),
            poll_ms: DEFAULT_POLL_MS,
        }
    }
}

impl ReloadConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys, and
    /// [`ConfigError::ZeroInterval`] if `poll_ms` is zero.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let mut document: toml::Table = toml::from_str(input)?;
        let table = match document.remove("rules") {
            Some(toml::Value::Table(rules)) => rules,
            Some(other) => {
                document.insert("rules".to_owned(), other);
                document
            }
            None => document,
        };
        let config: Self = toml::Value::Table(table).try_into()?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O or parse failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Reject settings the reloader cannot run with.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroInterval`] if `poll_ms` is zero.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.poll_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
