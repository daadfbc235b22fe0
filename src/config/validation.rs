use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Bucket name '{0}' must be 3-128 characters of [-_.a-z0-9]")]
    InvalidBucketName(String),

    #[error("Base URL '{0}' must be an http:// or https:// URL")]
    InvalidBaseUrl(String),

    #[error("listing.page_size must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),

    #[error("listing.max_pages must be positive")]
    InvalidMaxPages,

    #[error("aps.signed_url_minutes must be between 1 and 60, got {0}")]
    InvalidSignedUrlMinutes(u32),

    #[error("derivative.output_format must not be empty")]
    EmptyOutputFormat,

    #[error("server.max_upload_bytes must be positive")]
    InvalidUploadLimit,

    #[error("APS_CLIENT_ID and APS_CLIENT_SECRET must be set to reach the platform")]
    MissingCredentials,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_aps(config)?;
    validate_listing(config)?;
    validate_derivative(config)?;
    if config.server.max_upload_bytes == 0 {
        return Err(ValidationError::InvalidUploadLimit);
    }
    Ok(())
}

/// Bucket keys follow the platform's naming rule
pub fn is_valid_bucket_name(name: &str) -> bool {
    (3..=128).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

fn validate_aps(config: &Config) -> Result<(), ValidationError> {
    if !is_valid_bucket_name(&config.aps.bucket) {
        return Err(ValidationError::InvalidBucketName(config.aps.bucket.clone()));
    }

    match url::Url::parse(&config.aps.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => return Err(ValidationError::InvalidBaseUrl(config.aps.base_url.clone())),
    }

    if !(1..=60).contains(&config.aps.signed_url_minutes) {
        return Err(ValidationError::InvalidSignedUrlMinutes(
            config.aps.signed_url_minutes,
        ));
    }

    Ok(())
}

fn validate_listing(config: &Config) -> Result<(), ValidationError> {
    if !(1..=100).contains(&config.listing.page_size) {
        return Err(ValidationError::InvalidPageSize(config.listing.page_size));
    }
    if config.listing.max_pages == 0 {
        return Err(ValidationError::InvalidMaxPages);
    }
    Ok(())
}

fn validate_derivative(config: &Config) -> Result<(), ValidationError> {
    if config.derivative.output_format.trim().is_empty() {
        return Err(ValidationError::EmptyOutputFormat);
    }
    Ok(())
}

/// Client id and secret, required only when talking to the live platform
pub fn require_credentials(config: &Config) -> Result<(String, String), ValidationError> {
    match (&config.aps.client_id, &config.aps.client_secret) {
        (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
            Ok((id.clone(), secret.clone()))
        }
        _ => Err(ValidationError::MissingCredentials),
    }
}
