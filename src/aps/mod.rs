//! Platform collaborators: authentication, object storage and model derivative
//!
//! Each service is consumed through a narrow async trait so the gateway can
//! run against the live REST API ([`ApsClient`]) or the in-memory stand-in
//! ([`InMemoryPlatform`]) used by tests and offline runs.

mod client;
mod content;
mod error;
mod memory;
pub mod types;

pub use client::{ApsClient, ClientSettings, UPLOAD_CHUNK_BYTES};
pub use content::{ContentSource, PartReader};
pub use error::{ApsError, Result};
pub use memory::{CallCounts, InMemoryPlatform};

use async_trait::async_trait;
use bytes::Bytes;

use types::{
    BucketDetails, CreateBucket, Credentials, JobRequest, JobResponse, ListQuery, Manifest,
    ObjectDetails, ObjectsPage, Region, ScopeSet, SignedDownload, ThumbnailSize,
};

/// Two-legged credential issuance
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn two_legged_token(&self, scopes: ScopeSet) -> Result<Credentials>;
}

/// Object Storage Service operations
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn bucket_details(&self, token: &str, bucket: &str) -> Result<BucketDetails>;

    async fn create_bucket(
        &self,
        token: &str,
        region: Region,
        request: &CreateBucket,
    ) -> Result<BucketDetails>;

    async fn list_objects(&self, token: &str, bucket: &str, query: &ListQuery)
    -> Result<ObjectsPage>;

    async fn upload_object(
        &self,
        token: &str,
        bucket: &str,
        key: &str,
        source: ContentSource,
    ) -> Result<ObjectDetails>;

    async fn object_details(&self, token: &str, bucket: &str, key: &str) -> Result<ObjectDetails>;

    async fn signed_download(
        &self,
        token: &str,
        bucket: &str,
        key: &str,
        minutes: u32,
    ) -> Result<SignedDownload>;
}

/// Model Derivative operations
#[async_trait]
pub trait DerivativeService: Send + Sync {
    async fn start_job(&self, token: &str, request: &JobRequest) -> Result<JobResponse>;

    async fn manifest(&self, token: &str, urn: &str) -> Result<Manifest>;

    async fn thumbnail(&self, token: &str, urn: &str, size: ThumbnailSize) -> Result<Bytes>;
}
