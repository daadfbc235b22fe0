//! Wire types for the platform REST API

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// OAuth scope understood by the authentication service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    ViewablesRead,
    DataRead,
    DataCreate,
    DataWrite,
    BucketCreate,
    BucketRead,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::ViewablesRead => "viewables:read",
            Scope::DataRead => "data:read",
            Scope::DataCreate => "data:create",
            Scope::DataWrite => "data:write",
            Scope::BucketCreate => "bucket:create",
            Scope::BucketRead => "bucket:read",
        }
    }
}

/// The two credential flavours handed out by this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeSet {
    /// Read-only credential for the browser viewer
    Viewer,
    /// Read/write/bucket credential, also used internally
    Full,
}

impl ScopeSet {
    pub fn scopes(&self) -> &'static [Scope] {
        match self {
            ScopeSet::Viewer => &[Scope::ViewablesRead],
            ScopeSet::Full => &[
                Scope::DataRead,
                Scope::DataCreate,
                Scope::DataWrite,
                Scope::BucketCreate,
                Scope::BucketRead,
            ],
        }
    }

    /// Space separated scope string as sent in the token request
    pub fn to_scope_param(&self) -> String {
        self.scopes()
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Two-legged access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

/// Data center a bucket lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum Region {
    #[default]
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EMEA")]
    Emea,
    #[serde(rename = "AUS")]
    Aus,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::Emea => "EMEA",
            Region::Aus => "AUS",
        }
    }
}

/// Bucket retention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKey {
    Transient,
    Temporary,
    #[default]
    Persistent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketDetails {
    pub bucket_key: String,
    #[serde(default)]
    pub policy_key: Option<PolicyKey>,
    #[serde(default)]
    pub created_date: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucket {
    pub bucket_key: String,
    pub policy_key: PolicyKey,
}

/// Listing entry; also the shape returned by upload and details calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetails {
    pub bucket_key: String,
    pub object_key: String,
    pub object_id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// One page of an object listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectsPage {
    #[serde(default)]
    pub items: Vec<ObjectDetails>,
    /// Absolute URL of the following page, carrying a `startAt` parameter
    #[serde(default)]
    pub next: Option<String>,
}

/// Listing request parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: u32,
    pub start_at: Option<String>,
    pub begins_with: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub upload_key: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedDownload {
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha1: Option<String>,
}

/// Derivative view kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    #[builder(into)]
    pub urn: String,
    #[builder(default)]
    pub compressed_urn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub views: Vec<View>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    pub formats: Vec<JobFormat>,
}

/// Body of a derivative job submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub input: JobInput,
    pub output: JobOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub result: String,
    #[serde(default)]
    pub urn: Option<String>,
}

/// Translation manifest tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub derivatives: Vec<ManifestNode>,
}

/// A derivative or any nested child of one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestNode {
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default)]
    pub children: Vec<ManifestNode>,
}

/// Thumbnail edge length accepted by the derivative service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum ThumbnailSize {
    Small,
    Medium,
    #[default]
    Large,
}

impl ThumbnailSize {
    pub fn pixels(&self) -> u32 {
        match self {
            ThumbnailSize::Small => 100,
            ThumbnailSize::Medium => 200,
            ThumbnailSize::Large => 400,
        }
    }
}

impl TryFrom<u32> for ThumbnailSize {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            100 => Ok(ThumbnailSize::Small),
            200 => Ok(ThumbnailSize::Medium),
            400 => Ok(ThumbnailSize::Large),
            other => Err(format!(
                "thumbnail size must be 100, 200 or 400, got {other}"
            )),
        }
    }
}

impl From<ThumbnailSize> for u32 {
    fn from(value: ThumbnailSize) -> Self {
        value.pixels()
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pixels())
    }
}
