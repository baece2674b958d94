use crate::errors::{EnvError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the optional tuning file looked up next to the compose file
pub const CONFIG_FILE_NAME: &str = "leia-env.yml";

/// Compose image used when local compose is disabled
pub const DEFAULT_COMPOSE_IMAGE: &str = "docker/compose:1.29.2";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EnvConfig {
    #[serde(default = "default_compose_image")]
    pub compose_image: String,
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    #[serde(default)]
    pub pull: bool,
    #[serde(default = "default_project_prefix")]
    pub project_prefix: String,
}

fn default_compose_image() -> String {
    DEFAULT_COMPOSE_IMAGE.to_string()
}

fn default_startup_timeout() -> String {
    "120s".to_string()
}

fn default_poll_interval() -> String {
    "500ms".to_string()
}

fn default_project_prefix() -> String {
    "leia".to_string()
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            compose_image: default_compose_image(),
            startup_timeout: default_startup_timeout(),
            poll_interval: default_poll_interval(),
            pull: false,
            project_prefix: default_project_prefix(),
        }
    }
}

impl EnvConfig {
    /// Load config from leia-env.yml in the given directory
    pub fn load(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            // No config file, return defaults
            return Ok(EnvConfig::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: EnvConfig = serde_yml::from_str(&content)
            .map_err(|e| EnvError::ConfigError(format!("Failed to parse config: {}", e)))?;

        // Surface bad durations at load time rather than mid-startup
        config.startup_timeout()?;
        config.poll_interval()?;

        Ok(config)
    }

    pub fn startup_timeout(&self) -> Result<Duration> {
        parse_duration(&self.startup_timeout)
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        parse_duration(&self.poll_interval)
    }
}

/// Parse a duration string ("500ms", "30s", "2m") into a Duration.
/// A bare number is read as seconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let invalid = || EnvError::ConfigError(format!("Invalid duration value: {}", value));

    if let Some(num_str) = value.strip_suffix("ms") {
        num_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| invalid())
    } else if let Some(num_str) = value.strip_suffix('s') {
        num_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| invalid())
    } else if let Some(num_str) = value.strip_suffix('m') {
        let minutes = num_str.parse::<u64>().map_err(|_| invalid())?;
        minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(invalid)
    } else {
        value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| invalid())
    }
}
