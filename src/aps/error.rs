use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("platform returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected platform response: {0}")]
    InvalidResponse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApsError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApsError::Conflict(_))
    }

    /// Classify a non-success response status
    pub fn from_status(status: StatusCode, resource: &str, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApsError::NotFound(resource.to_string()),
            StatusCode::CONFLICT => ApsError::Conflict(resource.to_string()),
            _ => ApsError::Status { status, body },
        }
    }
}

pub type Result<T> = std::result::Result<T, ApsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies() {
        assert!(ApsError::from_status(StatusCode::NOT_FOUND, "b", String::new()).is_not_found());
        assert!(ApsError::from_status(StatusCode::CONFLICT, "b", String::new()).is_conflict());

        let err = ApsError::from_status(StatusCode::FORBIDDEN, "b", "denied".into());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "platform returned HTTP 403 Forbidden: denied");
    }
}
