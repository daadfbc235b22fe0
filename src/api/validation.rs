use base64::Engine;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use bytes::Bytes;
use thiserror::Error;

use super::models::Base64UploadRequest;

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("The fields \"objectName\" and \"base64Data\" are required.")]
    MissingFields,
    #[error("The field \"base64Data\" is not valid base64: {0}")]
    InvalidBase64(String),
}

/// A decoded base64 upload, ready for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedUpload {
    pub object_name: String,
    pub data: Bytes,
}

/// Check both fields are present and decode the payload.
///
/// A `data:<mime>;base64,` prefix is stripped and ASCII whitespace ignored.
pub fn validate_base64_upload(
    request: Base64UploadRequest,
) -> Result<DecodedUpload, UploadValidationError> {
    let object_name = request
        .object_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let encoded = request.base64_data.filter(|data| !data.trim().is_empty());

    let (Some(object_name), Some(encoded)) = (object_name, encoded) else {
        return Err(UploadValidationError::MissingFields);
    };

    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded.as_str(),
    };
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let data = LENIENT_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| UploadValidationError::InvalidBase64(e.to_string()))?;

    Ok(DecodedUpload {
        object_name,
        data: Bytes::from(data),
    })
}
