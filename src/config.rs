use crate::catalog::{CatalogError, parse_catalog_url};
use crate::registry::sync::ExponentialReconnection;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CHAINS_URL: &str =
    "https://raw.githubusercontent.com/soramitsu/fearless-utils/master/chains/v2/chains.json";
const DEFAULT_ASSETS_URL: &str =
    "https://raw.githubusercontent.com/soramitsu/fearless-utils/master/chains/v2/assets.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidUrl(#[from] CatalogError),

    #[error("Invalid retry setting: {0}")]
    InvalidRetry(String),
}

/// Sync engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub retry: RetryConfig,
}

/// Remote catalog endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub chains_url: String,
    pub assets_url: String,
    /// Timeout of a single HTTP request, in seconds
    pub request_timeout_secs: u64,
    /// Time budget for retrying one fetch before it degrades to an empty catalog, in seconds
    pub fetch_max_elapsed_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            chains_url: DEFAULT_CHAINS_URL.to_string(),
            assets_url: DEFAULT_ASSETS_URL.to_string(),
            request_timeout_secs: 30,
            fetch_max_elapsed_secs: 10,
        }
    }
}

/// Local storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Backoff between failed passes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay in seconds
    pub multiplier: f64,
    pub exponent: f64,
    pub max_delay_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let strategy = ExponentialReconnection::default();
        Self {
            multiplier: strategy.multiplier,
            exponent: strategy.exponent,
            max_delay_secs: None,
            max_attempts: None,
        }
    }
}

impl SyncConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chains_url()?;
        self.assets_url()?;

        for (name, value) in [
            ("multiplier", self.retry.multiplier),
            ("exponent", self.retry.exponent),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidRetry(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    pub fn chains_url(&self) -> Result<Url, ConfigError> {
        Ok(parse_catalog_url(&self.catalog.chains_url)?)
    }

    pub fn assets_url(&self) -> Result<Url, ConfigError> {
        Ok(parse_catalog_url(&self.catalog.assets_url)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.request_timeout_secs)
    }

    pub fn fetch_max_elapsed(&self) -> Duration {
        Duration::from_secs(self.catalog.fetch_max_elapsed_secs)
    }

    pub fn retry_strategy(&self) -> ExponentialReconnection {
        ExponentialReconnection {
            multiplier: self.retry.multiplier,
            exponent: self.retry.exponent,
            max_delay: self.retry.max_delay_secs.map(Duration::from_secs),
            max_attempts: self.retry.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.catalog.request_timeout_secs, 30);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.retry.multiplier, 0.3);
        assert!(config.retry_strategy().max_attempts.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
            [catalog]
            chains_url = "https://example.org/chains.json"

            [retry]
            max_attempts = 5
            max_delay_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog.chains_url, "https://example.org/chains.json");
        assert_eq!(config.catalog.assets_url, DEFAULT_ASSETS_URL);
        let strategy = config.retry_strategy();
        assert_eq!(strategy.max_attempts, Some(5));
        assert_eq!(strategy.max_delay, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = SyncConfig::from_toml_str(
            r#"
            [catalog]
            assets_url = "assets.json"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_retry_is_rejected() {
        for retry in ["exponent = 0.0", "multiplier = -1.0", "multiplier = nan"] {
            let result = SyncConfig::from_toml_str(&format!("[retry]\n{}\n", retry));
            assert!(
                matches!(result, Err(ConfigError::InvalidRetry(_))),
                "{} was accepted",
                retry
            );
        }

        let config = SyncConfig::from_toml_str("[retry]\nmultiplier = 1.5\n").unwrap();
        assert_eq!(config.retry.multiplier, 1.5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, "[storage]\ndata_dir = \"/var/lib/chains\"\n").unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/chains"));
        assert!(matches!(
            SyncConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
