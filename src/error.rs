use thiserror::Error;

use crate::aps::ApsError;
use crate::urn::UrnError;

/// Errors surfaced by the storage gateway and translation service
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] UrnError),

    #[error("Thumbnail not found for the given URN")]
    ThumbnailNotFound,

    #[error("listing of bucket '{bucket}' exceeded {max_pages} pages")]
    PageLimitExceeded { bucket: String, max_pages: usize },

    #[error("platform call failed: {0}")]
    Upstream(#[from] ApsError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
