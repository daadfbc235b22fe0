use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "APSGATE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/apsgate.toml";
const ENV_PREFIX: &str = "APSGATE";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);

    Ok(config)
}

/// Client credentials only ever come from the environment.
/// `APS_BUCKET` is honoured as a shorthand for `APSGATE__APS__BUCKET`.
fn load_secrets(config: &mut Config) {
    if let Ok(client_id) = env::var("APS_CLIENT_ID") {
        config.aps.client_id = Some(client_id);
    }
    if let Ok(client_secret) = env::var("APS_CLIENT_SECRET") {
        config.aps.client_secret = Some(client_secret);
    }
    if let Ok(bucket) = env::var("APS_BUCKET") {
        if !bucket.is_empty() {
            config.aps.bucket = bucket;
        }
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // APSGATE__LISTING__PAGE_SIZE -> listing.page_size
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aps::types::{PolicyKey, Region, ThumbnailSize};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.aps.bucket, "apsgate-models");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
max_upload_bytes = 1048576

[aps]
bucket = "acme-models"
region = "EMEA"
policy_key = "temporary"
signed_url_minutes = 15

[listing]
page_size = 10
max_pages = 5

[derivative]
output_format = "svf"
thumbnail_size = 200
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.max_upload_bytes, 1024 * 1024);
        assert_eq!(config.aps.bucket, "acme-models");
        assert_eq!(config.aps.region, Region::Emea);
        assert_eq!(config.aps.policy_key, PolicyKey::Temporary);
        assert_eq!(config.aps.signed_url_minutes, 15);
        assert_eq!(config.listing.page_size, 10);
        assert_eq!(config.listing.max_pages, 5);
        assert_eq!(config.derivative.output_format, "svf");
        assert_eq!(config.derivative.thumbnail_size, ThumbnailSize::Medium);
        // untouched values keep their defaults
        assert_eq!(config.aps.refresh_margin_secs, 60);
    }

    #[test]
    fn test_client_secret_in_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[aps]\nclient_secret = \"leaked\"\n").unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert!(config.aps.client_secret.is_none());
    }
}
