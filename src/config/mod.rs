//! Configuration management for Noticeboard.
//!
//! Configuration is read from `~/.config/noticeboard/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod polling;
pub mod server;

pub use polling::PollingConfig;
pub use server::{PushConfig, ServerConfig, StoreConfig};

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "NOTICEBOARD_TOKEN";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub store: StoreConfig,
    pub push: PushConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load from an explicit path, writing the commented default if missing.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/noticeboard/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("noticeboard").join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.server.token = Some(token.trim().to_string());
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.polling;
        if p.base_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "polling.base_interval_ms must be positive".into(),
            ));
        }
        if p.max_interval_ms < p.base_interval_ms {
            return Err(ConfigError::Invalid(
                "polling.max_interval_ms must be >= polling.base_interval_ms".into(),
            ));
        }
        if p.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "polling.backoff_multiplier must be >= 1.0".into(),
            ));
        }
        if p.failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "polling.failure_threshold must be at least 1".into(),
            ));
        }
        url::Url::parse(&self.server.base_url).map_err(|e| {
            ConfigError::Invalid(format!("server.base_url is not a valid URL: {}", e))
        })?;
        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Noticeboard Configuration
#
# The access token can also be supplied through the NOTICEBOARD_TOKEN
# environment variable, which takes precedence over server.token.

[server]
base_url = "http://localhost:3000/api"
web_url = "http://localhost:3000"
# ws_url = "ws://localhost:3000/api/ws"
# token = ""
timeout_secs = 10

[polling]
# Healthy cadence for the unread-count poll
base_interval_ms = 30000
# Cap for exponential backoff
max_interval_ms = 300000
backoff_multiplier = 2.0
# Fixed wait after the server answers 429
rate_limit_cooldown_ms = 300000
# Consecutive failures before polling is suspended
failure_threshold = 3
circuit_cooldown_ms = 60000

[store]
max_items = 100

[push]
enabled = true
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.polling.base_interval_ms, 30_000);
        assert_eq!(config.polling.failure_threshold, 3);
        assert_eq!(config.store.max_items, 100);
        assert!(config.push.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[polling]
base_interval_ms = 5000
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom value
        assert_eq!(config.polling.base_interval_ms, 5000);
        // Default value
        assert_eq!(config.polling.rate_limit_cooldown_ms, 300_000);
        assert_eq!(config.server.timeout_secs, 10);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.server.base_url, "http://localhost:3000/api");
        assert_eq!(config.polling.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.polling.max_interval_ms, 300_000);

        // Second load parses the written file
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.server.web_url, "http://localhost:3000");
    }

    #[test]
    fn test_load_from_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[polling]\nbase_interval_ms = 60000\nmax_interval_ms = 1000\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[polling\nbroken").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
