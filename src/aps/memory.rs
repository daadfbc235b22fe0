//! In-memory platform for tests and offline development

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{
    BucketDetails, CreateBucket, Credentials, JobRequest, JobResponse, ListQuery, Manifest,
    ObjectDetails, ObjectsPage, Region, ScopeSet, SignedDownload, ThumbnailSize,
};
use super::{ApsError, Authenticator, ContentSource, DerivativeService, ObjectStorage, Result};
use crate::urn::ObjectId;

const LOCAL_BASE: &str = "http://localhost/oss/v2/buckets";

#[derive(Debug, Default)]
struct Counters {
    tokens: AtomicU64,
    bucket_details: AtomicU64,
    create_bucket: AtomicU64,
    list_objects: AtomicU64,
    upload_object: AtomicU64,
    object_details: AtomicU64,
    start_job: AtomicU64,
    manifest: AtomicU64,
    thumbnail: AtomicU64,
}

/// Snapshot of how often each platform call was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    pub tokens: u64,
    pub bucket_details: u64,
    pub create_bucket: u64,
    pub list_objects: u64,
    pub upload_object: u64,
    pub object_details: u64,
    pub start_job: u64,
    pub manifest: u64,
    pub thumbnail: u64,
}

#[derive(Debug, Default)]
struct State {
    buckets: HashMap<String, BTreeMap<String, (Bytes, ObjectDetails)>>,
    forbidden_buckets: HashSet<String>,
    manifests: HashMap<String, Manifest>,
    thumbnails: HashMap<String, Bytes>,
    jobs: Vec<JobRequest>,
}

/// Platform stand-in keeping buckets, objects and manifests in memory
#[derive(Debug)]
pub struct InMemoryPlatform {
    state: Mutex<State>,
    counters: Counters,
    token_ttl_secs: AtomicU64,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            counters: Counters::default(),
            token_ttl_secs: AtomicU64::new(3599),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        // a poisoned lock only means another test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lifetime reported for issued tokens
    pub fn set_token_ttl(&self, secs: u64) {
        self.token_ttl_secs.store(secs, Ordering::Relaxed);
    }

    /// Create a bucket directly, bypassing call counters
    pub fn seed_bucket(&self, bucket: &str) {
        self.state().buckets.entry(bucket.to_string()).or_default();
    }

    /// Store an object directly, bypassing call counters
    pub fn seed_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) -> ObjectDetails {
        let data = data.into();
        let details = details_for(bucket, key, &data);
        self.state()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), (data, details.clone()));
        details
    }

    /// Make every call touching `bucket` fail with 403
    pub fn forbid_bucket(&self, bucket: &str) {
        self.state().forbidden_buckets.insert(bucket.to_string());
    }

    pub fn put_manifest(&self, urn: &str, manifest: Manifest) {
        self.state().manifests.insert(urn.to_string(), manifest);
    }

    pub fn put_thumbnail(&self, urn: &str, png: impl Into<Bytes>) {
        self.state().thumbnails.insert(urn.to_string(), png.into());
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.state().buckets.contains_key(bucket)
    }

    pub fn object_bytes(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|(data, _)| data.clone())
    }

    pub fn submitted_jobs(&self) -> Vec<JobRequest> {
        self.state().jobs.clone()
    }

    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            tokens: c.tokens.load(Ordering::Relaxed),
            bucket_details: c.bucket_details.load(Ordering::Relaxed),
            create_bucket: c.create_bucket.load(Ordering::Relaxed),
            list_objects: c.list_objects.load(Ordering::Relaxed),
            upload_object: c.upload_object.load(Ordering::Relaxed),
            object_details: c.object_details.load(Ordering::Relaxed),
            start_job: c.start_job.load(Ordering::Relaxed),
            manifest: c.manifest.load(Ordering::Relaxed),
            thumbnail: c.thumbnail.load(Ordering::Relaxed),
        }
    }

    fn check_access(state: &State, bucket: &str) -> Result<()> {
        if state.forbidden_buckets.contains(bucket) {
            return Err(ApsError::from_status(
                StatusCode::FORBIDDEN,
                bucket,
                format!("access to bucket '{bucket}' denied"),
            ));
        }
        Ok(())
    }
}

fn details_for(bucket: &str, key: &str, data: &Bytes) -> ObjectDetails {
    ObjectDetails {
        bucket_key: bucket.to_string(),
        object_key: key.to_string(),
        object_id: ObjectId::new(bucket, key).to_string(),
        size: data.len() as u64,
        sha1: None,
        content_type: Some(mime::APPLICATION_OCTET_STREAM.to_string()),
        location: Some(format!("{LOCAL_BASE}/{bucket}/objects/{key}")),
    }
}

fn next_link(bucket: &str, start_at: &str, limit: u32) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("startAt", start_at)
        .append_pair("limit", &limit.to_string())
        .finish();
    format!("{LOCAL_BASE}/{bucket}/objects?{query}")
}

#[async_trait]
impl Authenticator for InMemoryPlatform {
    async fn two_legged_token(&self, scopes: ScopeSet) -> Result<Credentials> {
        let n = self.counters.tokens.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Credentials {
            access_token: format!("mem-{scopes:?}-{n}").to_lowercase(),
            expires_in: self.token_ttl_secs.load(Ordering::Relaxed),
            token_type: "Bearer".to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for InMemoryPlatform {
    async fn bucket_details(&self, _token: &str, bucket: &str) -> Result<BucketDetails> {
        self.counters.bucket_details.fetch_add(1, Ordering::Relaxed);
        let state = self.state();
        Self::check_access(&state, bucket)?;
        if !state.buckets.contains_key(bucket) {
            return Err(ApsError::NotFound(bucket.to_string()));
        }
        Ok(BucketDetails {
            bucket_key: bucket.to_string(),
            policy_key: None,
            created_date: None,
        })
    }

    async fn create_bucket(
        &self,
        _token: &str,
        _region: Region,
        request: &CreateBucket,
    ) -> Result<BucketDetails> {
        self.counters.create_bucket.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state();
        Self::check_access(&state, &request.bucket_key)?;
        if state.buckets.contains_key(&request.bucket_key) {
            return Err(ApsError::Conflict(request.bucket_key.clone()));
        }
        state.buckets.insert(request.bucket_key.clone(), BTreeMap::new());
        Ok(BucketDetails {
            bucket_key: request.bucket_key.clone(),
            policy_key: Some(request.policy_key),
            created_date: None,
        })
    }

    async fn list_objects(
        &self,
        _token: &str,
        bucket: &str,
        query: &ListQuery,
    ) -> Result<ObjectsPage> {
        self.counters.list_objects.fetch_add(1, Ordering::Relaxed);
        let state = self.state();
        Self::check_access(&state, bucket)?;
        let objects = state
            .buckets
            .get(bucket)
            .ok_or_else(|| ApsError::NotFound(bucket.to_string()))?;

        let limit = query.limit.max(1) as usize;
        let prefix = query.begins_with.as_deref().unwrap_or("");
        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| match query.start_at {
                Some(ref start) => key.as_str() >= start.as_str(),
                None => true,
            })
            .map(|(_, (_, details))| details.clone());

        let items: Vec<ObjectDetails> = matching.by_ref().take(limit).collect();
        let next = matching
            .next()
            .map(|following| next_link(bucket, &following.object_key, query.limit));

        Ok(ObjectsPage { items, next })
    }

    async fn upload_object(
        &self,
        _token: &str,
        bucket: &str,
        key: &str,
        source: ContentSource,
    ) -> Result<ObjectDetails> {
        self.counters.upload_object.fetch_add(1, Ordering::Relaxed);
        let data = source.into_bytes().await?;
        let mut state = self.state();
        Self::check_access(&state, bucket)?;
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| ApsError::NotFound(bucket.to_string()))?;

        let details = details_for(bucket, key, &data);
        objects.insert(key.to_string(), (data, details.clone()));
        Ok(details)
    }

    async fn object_details(&self, _token: &str, bucket: &str, key: &str) -> Result<ObjectDetails> {
        self.counters.object_details.fetch_add(1, Ordering::Relaxed);
        let state = self.state();
        Self::check_access(&state, bucket)?;
        state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|(_, details)| details.clone())
            .ok_or_else(|| ApsError::NotFound(format!("{bucket}/{key}")))
    }

    async fn signed_download(
        &self,
        _token: &str,
        bucket: &str,
        key: &str,
        minutes: u32,
    ) -> Result<SignedDownload> {
        let state = self.state();
        Self::check_access(&state, bucket)?;
        let (data, _) = state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| ApsError::NotFound(format!("{bucket}/{key}")))?;

        Ok(SignedDownload {
            url: format!("{LOCAL_BASE}/{bucket}/objects/{key}?signed=1&minutes={minutes}"),
            size: Some(data.len() as u64),
            sha1: None,
        })
    }
}

#[async_trait]
impl DerivativeService for InMemoryPlatform {
    async fn start_job(&self, _token: &str, request: &JobRequest) -> Result<JobResponse> {
        self.counters.start_job.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state();
        state.jobs.push(request.clone());
        state.manifests.insert(
            request.input.urn.clone(),
            Manifest {
                status: "pending".to_string(),
                progress: "0% complete".to_string(),
                derivatives: Vec::new(),
            },
        );
        Ok(JobResponse {
            result: "created".to_string(),
            urn: Some(request.input.urn.clone()),
        })
    }

    async fn manifest(&self, _token: &str, urn: &str) -> Result<Manifest> {
        self.counters.manifest.fetch_add(1, Ordering::Relaxed);
        self.state()
            .manifests
            .get(urn)
            .cloned()
            .ok_or_else(|| ApsError::NotFound(urn.to_string()))
    }

    async fn thumbnail(&self, _token: &str, urn: &str, _size: ThumbnailSize) -> Result<Bytes> {
        self.counters.thumbnail.fetch_add(1, Ordering::Relaxed);
        self.state()
            .thumbnails
            .get(urn)
            .cloned()
            .ok_or_else(|| ApsError::NotFound(urn.to_string()))
    }
}
