//! API utility functions
//!
//! Helpers for pulling model uploads out of multipart requests.
//!
//! File parts are spooled to a temporary file as they arrive, so a model is
//! never held in memory whole.

use axum::extract::Multipart;
use axum::extract::multipart::Field;
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;

use crate::api::error::ApiError;

pub const MODEL_FILE_FIELD: &str = "model-file";
pub const ZIP_ENTRYPOINT_FIELD: &str = "model-zip-entrypoint";

/// Parts of a model upload form
#[derive(Debug, Default)]
pub struct ModelUpload {
    pub file: Option<UploadedFile>,
    pub zip_entrypoint: Option<String>,
}

/// A file part spooled to disk; removed when dropped
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub path: TempPath,
    pub size: u64,
}

impl ModelUpload {
    /// The uploaded file, or the 400 returned when the field is absent
    pub fn require_file(self) -> Result<(UploadedFile, Option<String>), ApiError> {
        match self.file {
            Some(file) => Ok((file, self.zip_entrypoint)),
            None => Err(missing_field(MODEL_FILE_FIELD)),
        }
    }
}

pub fn missing_field(name: &str) -> ApiError {
    ApiError::InvalidPayload(format!("The required field (\"{name}\") is missing."))
}

/// Read the known fields of a model upload form, skipping the rest
pub async fn read_model_upload(mut multipart: Multipart) -> Result<ModelUpload, ApiError> {
    let mut upload = ModelUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(MODEL_FILE_FIELD) => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        ApiError::InvalidPayload(format!(
                            "The field (\"{MODEL_FILE_FIELD}\") must carry a file name."
                        ))
                    })?;
                upload.file = Some(spool_file(file_name, field).await?);
            }
            Some(ZIP_ENTRYPOINT_FIELD) => {
                let entrypoint = field.text().await?;
                upload.zip_entrypoint = Some(entrypoint).filter(|e| !e.trim().is_empty());
            }
            _ => {}
        }
    }

    Ok(upload)
}

fn spool_error(err: std::io::Error) -> ApiError {
    ApiError::Internal(format!("failed to spool upload: {err}"))
}

/// Copy a file part to a temporary file, one body chunk at a time
async fn spool_file(file_name: String, mut field: Field<'_>) -> Result<UploadedFile, ApiError> {
    let (file, path) = NamedTempFile::new().map_err(spool_error)?.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(spool_error)?;
    }
    file.flush().await.map_err(spool_error)?;

    Ok(UploadedFile {
        file_name,
        path,
        size,
    })
}

/// File name without any client-side directory components
pub fn sanitize_file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("chair.rvt"), "chair.rvt");
        assert_eq!(sanitize_file_name("C:\\models\\chair.rvt"), "chair.rvt");
        assert_eq!(sanitize_file_name("dir/sub/chair.rvt"), "chair.rvt");
    }

    #[test]
    fn test_missing_field_message() {
        let err = missing_field(MODEL_FILE_FIELD);
        assert_eq!(err.to_string(), "The required field (\"model-file\") is missing.");
    }

    #[test]
    fn test_require_file_without_file() {
        let result = ModelUpload::default().require_file();
        assert!(matches!(result, Err(ApiError::InvalidPayload(_))));
    }
}
