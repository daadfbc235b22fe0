//! Configuration management for apsgate
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use apsgate::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any setting can be overridden with `APSGATE__<section>__<key>`:
//! - `APSGATE__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `APSGATE__APS__BUCKET=acme-models`
//! - `APSGATE__LISTING__PAGE_SIZE=32`
//!
//! Client credentials are read only from `APS_CLIENT_ID` and
//! `APS_CLIENT_SECRET`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/apsgate.toml`.
//! This can be overridden using the `APSGATE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{ApsConfig, Config, DerivativeConfig, ListingConfig, ServerConfig};
pub use validation::{ValidationError, is_valid_bucket_name};

use thiserror::Error;

use crate::aps::ClientSettings;
use crate::storage::GatewaySettings;
use crate::translation::TranslationSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// HTTP client settings; fails when credentials are missing
    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        let (client_id, client_secret) = validation::require_credentials(self)?;
        Ok(ClientSettings {
            base_url: self.aps.base_url.clone(),
            client_id,
            client_secret,
            request_timeout: self.aps.request_timeout(),
            ..ClientSettings::default()
        })
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            bucket: self.aps.bucket.clone(),
            region: self.aps.region,
            policy_key: self.aps.policy_key,
            page_size: self.listing.page_size,
            max_pages: self.listing.max_pages,
            signed_url_minutes: self.aps.signed_url_minutes,
        }
    }

    pub fn translation_settings(&self) -> TranslationSettings {
        TranslationSettings {
            output_format: self.derivative.output_format.clone(),
            thumbnail_size: self.derivative.thumbnail_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[aps]\nbucket = \"minimal-models\"\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.gateway_settings().bucket, "minimal-models");
        assert_eq!(config.gateway_settings().page_size, 64);
    }

    #[test]
    fn test_validation_catches_bad_page_size() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[listing]\npage_size = 500\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidPageSize(500))
        ));
    }

    #[test]
    fn test_client_settings_need_credentials() {
        let mut config = Config::default();
        assert!(matches!(
            config.client_settings(),
            Err(ConfigError::ValidationError(ValidationError::MissingCredentials))
        ));

        config.aps.client_id = Some("id".into());
        config.aps.client_secret = Some("secret".into());
        config.aps.request_timeout_secs = 5;
        let settings = config.client_settings().unwrap();
        assert_eq!(settings.client_id, "id");
        assert_eq!(settings.request_timeout.as_secs(), 5);
    }
}
