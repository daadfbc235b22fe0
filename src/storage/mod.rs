//! Folder-scoped object gateway
//!
//! Folders are key prefixes inside one configured bucket. Every operation
//! derives its storage key through [`resolve_object_key`], so listing, upload
//! and lookup agree on the namespace.

mod bucket;
mod listing;

pub use bucket::BucketManager;
pub use crate::aps::ContentSource;
pub use listing::{ObjectPager, start_at_from_next};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::aps::types::{ObjectDetails, PolicyKey, Region};
use crate::aps::{ApsError, ObjectStorage};
use crate::auth::CredentialCache;
use crate::error::{GatewayError, Result};
use crate::observability::Metrics;
use crate::urn::{self, ObjectId, Urn};

/// Static gateway settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub bucket: String,
    pub region: Region,
    pub policy_key: PolicyKey,
    pub page_size: u32,
    pub max_pages: usize,
    pub signed_url_minutes: u32,
}


/// A stored object as seen by callers
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub object_id: String,
    pub urn: Urn,
    pub size: u64,
    pub location: Option<String>,
}

impl From<ObjectDetails> for StoredObject {
    fn from(details: ObjectDetails) -> Self {
        Self {
            urn: urn::encode(&details.object_id),
            key: details.object_key,
            object_id: details.object_id,
            size: details.size,
            location: details.location,
        }
    }
}

/// Descriptive metadata plus a time-limited download link
#[derive(Debug, Clone, Serialize)]
pub struct ObjectMetadata {
    pub key: String,
    pub bucket: String,
    pub object_id: String,
    pub size: u64,
    pub sha1: Option<String>,
    pub content_type: Option<String>,
    pub signed_url: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidInput(format!("{kind} name must not be empty")));
    }
    if value.contains('/') {
        return Err(GatewayError::InvalidInput(format!(
            "{kind} name '{value}' must not contain '/'"
        )));
    }
    if value == "." || value == ".." {
        return Err(GatewayError::InvalidInput(format!(
            "{kind} name '{value}' is reserved"
        )));
    }
    Ok(())
}

/// Storage key of `name` inside `folder`
pub fn resolve_object_key(folder: &str, name: &str) -> Result<String> {
    validate_segment("folder", folder)?;
    validate_segment("object", name)?;
    Ok(format!("{folder}/{name}"))
}

fn folder_prefix(folder: &str) -> Result<String> {
    validate_segment("folder", folder)?;
    Ok(format!("{folder}/"))
}

pub struct ObjectGateway {
    storage: Arc<dyn ObjectStorage>,
    credentials: Arc<CredentialCache>,
    buckets: BucketManager,
    settings: GatewaySettings,
    metrics: Arc<Metrics>,
}

impl ObjectGateway {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        credentials: Arc<CredentialCache>,
        settings: GatewaySettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        let buckets = BucketManager::new(storage.clone(), settings.region, settings.policy_key);
        Self {
            storage,
            credentials,
            buckets,
            settings,
            metrics,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    fn upstream(&self, err: ApsError) -> GatewayError {
        self.metrics.upstream_failed();
        GatewayError::Upstream(err)
    }

    /// Token for the call plus a guarantee that the default bucket exists
    async fn provisioned_token(&self) -> Result<String> {
        let token = self
            .credentials
            .internal_token()
            .await
            .map_err(|e| self.upstream(e))?;
        self.buckets
            .ensure_exists(&token, &self.settings.bucket)
            .await
            .map_err(|e| self.upstream(e))?;
        Ok(token)
    }

    async fn list(&self, prefix: Option<String>) -> Result<Vec<StoredObject>> {
        let token = self.provisioned_token().await?;
        let mut pager = ObjectPager::new(
            self.storage.clone(),
            token,
            self.settings.bucket.clone(),
            self.settings.page_size,
        );
        if let Some(prefix) = prefix {
            pager = pager.with_prefix(prefix);
        }

        let objects = pager
            .collect_all(self.settings.max_pages)
            .await
            .map_err(|e| match e {
                GatewayError::Upstream(err) => self.upstream(err),
                other => other,
            })?;
        Ok(objects.into_iter().map(StoredObject::from).collect())
    }

    /// Every object in the default bucket
    pub async fn list_models(&self) -> Result<Vec<StoredObject>> {
        self.list(None).await
    }

    /// Objects stored under `folder`
    pub async fn list_folder(&self, folder: &str) -> Result<Vec<StoredObject>> {
        let prefix = folder_prefix(folder)?;
        self.list(Some(prefix)).await
    }

    async fn put(&self, key: String, source: ContentSource) -> Result<StoredObject> {
        let token = self.provisioned_token().await?;
        let details = self
            .storage
            .upload_object(&token, &self.settings.bucket, &key, source)
            .await
            .map_err(|e| self.upstream(e))?;

        self.metrics.object_uploaded();
        info!(bucket = %self.settings.bucket, key, size = details.size, "Uploaded object");
        Ok(details.into())
    }

    /// Upload `name` into `folder`
    pub async fn upload(
        &self,
        folder: &str,
        name: &str,
        source: ContentSource,
    ) -> Result<StoredObject> {
        let key = resolve_object_key(folder, name)?;
        self.put(key, source).await
    }

    /// Upload `name` at the top level of the bucket
    pub async fn upload_root(&self, name: &str, source: ContentSource) -> Result<StoredObject> {
        validate_segment("object", name)?;
        self.put(name.to_string(), source).await
    }

    /// Upload under a caller-chosen name.
    ///
    /// `folder/name` lands in that folder, anything without a `/` at the top
    /// level. Each segment is checked like any other folder upload.
    pub async fn upload_named(
        &self,
        object_name: &str,
        source: ContentSource,
    ) -> Result<StoredObject> {
        match object_name.rsplit_once('/') {
            Some((folder, name)) => self.upload(folder, name, source).await,
            None => self.upload_root(object_name, source).await,
        }
    }

    /// Resolve a URN to its object and issue a signed download URL
    pub async fn fetch_metadata_by_urn(&self, urn: &str) -> Result<ObjectMetadata> {
        let decoded = urn::decode(urn)
            .map_err(|e| GatewayError::NotFound(format!("no object for URN '{urn}': {e}")))?;
        let id = ObjectId::parse(&decoded, &self.settings.bucket);
        if id.bucket != self.settings.bucket {
            return Err(GatewayError::NotFound(format!(
                "no object for URN '{urn}' in bucket '{}'",
                self.settings.bucket
            )));
        }

        let token = self
            .credentials
            .internal_token()
            .await
            .map_err(|e| self.upstream(e))?;
        let not_found = |err: ApsError| {
            if err.is_not_found() {
                GatewayError::NotFound(format!("object '{}' not found", id.key))
            } else {
                self.upstream(err)
            }
        };

        let details = self
            .storage
            .object_details(&token, &id.bucket, &id.key)
            .await
            .map_err(not_found)?;
        let minutes = self.settings.signed_url_minutes;
        let signed = self
            .storage
            .signed_download(&token, &id.bucket, &id.key, minutes)
            .await
            .map_err(not_found)?;

        Ok(ObjectMetadata {
            key: details.object_key,
            bucket: details.bucket_key,
            object_id: details.object_id,
            size: details.size,
            sha1: details.sha1.or(signed.sha1),
            content_type: details.content_type,
            signed_url: signed.url,
            expires_at: Utc::now() + chrono::Duration::minutes(i64::from(minutes)),
        })
    }
}
