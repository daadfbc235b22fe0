use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::aps::types::{PolicyKey, Region, ThumbnailSize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub aps: ApsConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub derivative: DerivativeConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Largest accepted request body (multipart or base64 JSON)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Static assets served at `/` when the directory exists
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload_bytes(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024 // 50 MB
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("wwwroot")
}

/// Platform connection and storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub region: Region,
    #[serde(default)]
    pub policy_key: PolicyKey,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Cached tokens are refreshed this long before they expire
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
    #[serde(default = "default_signed_url_minutes")]
    pub signed_url_minutes: u32,
    /// Loaded from environment, never from the config file
    #[serde(skip)]
    pub client_id: Option<String>,
    /// Loaded from environment, never from the config file
    #[serde(skip)]
    pub client_secret: Option<String>,
}

impl Default for ApsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bucket: default_bucket(),
            region: Region::default(),
            policy_key: PolicyKey::default(),
            request_timeout_secs: default_request_timeout_secs(),
            refresh_margin_secs: default_refresh_margin_secs(),
            signed_url_minutes: default_signed_url_minutes(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl ApsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }
}

fn default_base_url() -> String {
    "https://developer.api.autodesk.com".to_string()
}

fn default_bucket() -> String {
    "apsgate-models".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_refresh_margin_secs() -> u64 {
    60
}

fn default_signed_url_minutes() -> u32 {
    60
}

/// Object listing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_page_size() -> u32 {
    64
}

fn default_max_pages() -> usize {
    1000
}

/// Model derivative configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DerivativeConfig {
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub thumbnail_size: ThumbnailSize,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            thumbnail_size: ThumbnailSize::default(),
        }
    }
}

fn default_output_format() -> String {
    "svf2".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.aps.region, Region::Us);
        assert_eq!(config.aps.policy_key, PolicyKey::Persistent);
        assert_eq!(config.listing.page_size, 64);
        assert_eq!(config.derivative.output_format, "svf2");
        assert_eq!(config.derivative.thumbnail_size.pixels(), 400);
    }

    #[test]
    fn test_secrets_are_never_serialized() {
        let mut config = Config::default();
        config.aps.client_secret = Some("hunter2".into());

        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
    }
}
