//! Session configuration.
//!
//! Loaded from TOML or built in code. Every field has a default, so an empty document is
//! a valid configuration:
//!
//! ```toml
//! debug = false
//! update_delay_ms = 300000   # keepalive interval (alias: updateDelay)
//!
//! [reconnect]
//! base_delay_ms = 1000
//! max_delay_ms = 300000
//! max_attempts = 10
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default keepalive interval: five minutes.
pub const DEFAULT_UPDATE_DELAY_MS: u64 = 300_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log raw reports and every emitted event. No behavior change.
    pub debug: bool,

    /// Interval between bootstrap keepalive writes, in milliseconds.
    #[serde(alias = "updateDelay")]
    pub update_delay_ms: u64,

    pub reconnect: ReconnectConfig,
}

/// Tunables for the reconnection backoff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay unit multiplied by `1.5^attempt`.
    pub base_delay_ms: u64,
    /// Upper clamp on the delay; also the fixed cadence once `max_attempts` is reached.
    pub max_delay_ms: u64,
    /// Attempt count at which growth stops and `disconnected` is announced.
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            update_delay_ms: DEFAULT_UPDATE_DELAY_MS,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 300_000,
            max_attempts: 10,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.update_delay_ms == 0 {
            return Err(Error::InvalidConfig("update_delay_ms must be > 0".into()));
        }
        let r = &self.reconnect;
        if r.base_delay_ms == 0 || r.max_delay_ms == 0 {
            return Err(Error::InvalidConfig(
                "reconnect delays must be > 0".into(),
            ));
        }
        if r.base_delay_ms > r.max_delay_ms {
            return Err(Error::InvalidConfig(format!(
                "reconnect.base_delay_ms ({}) exceeds max_delay_ms ({})",
                r.base_delay_ms, r.max_delay_ms
            )));
        }
        if r.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "reconnect.max_attempts must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.update_delay(), Duration::from_secs(300));
        assert!(!config.debug);
    }

    #[test]
    fn accepts_camel_case_update_delay() {
        let config = Config::from_toml_str("debug = true\nupdateDelay = 60000\n").unwrap();
        assert!(config.debug);
        assert_eq!(config.update_delay_ms, 60_000);
    }

    #[test]
    fn partial_reconnect_table_keeps_other_defaults() {
        let config = Config::from_toml_str("[reconnect]\nmax_attempts = 3\n").unwrap();
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.reconnect.base_delay_ms, 1_000);
        assert_eq!(config.reconnect.max_delay_ms, 300_000);
    }

    #[test]
    fn rejects_zero_interval() {
        let err = Config::from_toml_str("update_delay_ms = 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_inverted_delays() {
        let err = Config::from_toml_str("[reconnect]\nbase_delay_ms = 5000\nmax_delay_ms = 10\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml_str("debug = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
