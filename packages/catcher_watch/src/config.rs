use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::WatchError;
use crate::render::{MAX_BODY_CHARS, Renderer};
use crate::session::DEFAULT_ID_LENGTH;
use crate::watcher::WatchOptions;

// =============================================================================
// Tunables (figment-deserialized from defaults / rcw.toml / env vars)
// =============================================================================
//
//   rcw.toml:   service_domain = "requestcatcher.com"
//               retry_delay_secs = 3
//
//   env var:    RCW_RETRY_DELAY_SECS=10
//
// Explicit CLI flags are applied on top by the binary.

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "rcw.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Catching service; the session id is prepended as a subdomain.
    #[serde(default = "default_service_domain")]
    pub service_domain: String,
    /// Length of generated session ids.
    #[serde(default = "default_id_length")]
    pub id_length: usize,
    /// Fixed wait between a connection failure and the next attempt.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            service_domain: default_service_domain(),
            id_length: default_id_length(),
            retry_delay_secs: default_retry_delay_secs(),
            max_body_chars: default_max_body_chars(),
        }
    }
}

fn default_service_domain() -> String {
    "requestcatcher.com".to_string()
}
fn default_id_length() -> usize {
    DEFAULT_ID_LENGTH
}
fn default_retry_delay_secs() -> u64 {
    3
}
fn default_max_body_chars() -> usize {
    MAX_BODY_CHARS
}

/// Layer defaults → TOML file → `RCW_*` env vars.
///
/// A missing file is not an error; figment simply skips it.
pub fn layered(config_file: &Path) -> Figment {
    Figment::from(Serialized::defaults(WatchConfig::default()))
        .merge(Toml::file(config_file))
        .merge(Env::prefixed("RCW_"))
}

impl WatchConfig {
    /// Load from `config_file` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, WatchError> {
        let path = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config: Self = layered(path).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), WatchError> {
        let invalid = |msg: &str| {
            WatchError::Config(Box::new(<figment::Error as serde::de::Error>::custom(msg)))
        };
        if self.service_domain.trim().is_empty() {
            return Err(invalid("service_domain must not be empty"));
        }
        if self.id_length == 0 {
            return Err(invalid("id_length must be at least 1"));
        }
        if self.retry_delay_secs == 0 {
            return Err(invalid("retry_delay_secs must be at least 1"));
        }
        if self.max_body_chars == 0 {
            return Err(invalid("max_body_chars must be at least 1"));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            retry_delay: self.retry_delay(),
            renderer: Renderer::new(self.max_body_chars),
        }
    }
}
