//! Request and response bodies of the HTTP API
//!
//! Field names follow the wire contract used by the browser viewer, which is
//! why some structs rename to camelCase and others keep snake_case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observability::MetricsSnapshot;
use crate::storage::StoredObject;

/// Listing entry and upload result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub urn: String,
}

impl From<StoredObject> for ObjectEntry {
    fn from(object: StoredObject) -> Self {
        Self {
            name: object.key,
            urn: object.urn.into_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub url: String,
}

/// Body of `POST /api/models/upload-base64`
///
/// Both fields are optional at the serde level so a missing field becomes a
/// descriptive 400 instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base64UploadRequest {
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub base64_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base64UploadResponse {
    pub message: String,
    pub object_key: String,
    pub urn: String,
    pub size: u64,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThumbnailQuery {
    pub size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub counters: MetricsSnapshot,
}
