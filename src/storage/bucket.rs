//! Lazy bucket provisioning

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::aps::types::{CreateBucket, PolicyKey, Region};
use crate::aps::{ObjectStorage, Result};

/// Creates buckets on first reference and remembers the ones already seen
pub struct BucketManager {
    storage: Arc<dyn ObjectStorage>,
    region: Region,
    policy: PolicyKey,
    known: Mutex<HashSet<String>>,
}

impl BucketManager {
    pub fn new(storage: Arc<dyn ObjectStorage>, region: Region, policy: PolicyKey) -> Self {
        Self {
            storage,
            region,
            policy,
            known: Mutex::new(HashSet::new()),
        }
    }

    fn is_known(&self, bucket: &str) -> bool {
        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(bucket)
    }

    fn remember(&self, bucket: &str) {
        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(bucket.to_string());
    }

    /// Make sure `bucket` exists, creating it when the platform reports it absent.
    ///
    /// Only "not found" is recovered from. A conflict on create means another
    /// caller created it first. Every other failure is returned unchanged.
    pub async fn ensure_exists(&self, token: &str, bucket: &str) -> Result<()> {
        if self.is_known(bucket) {
            return Ok(());
        }

        match self.storage.bucket_details(token, bucket).await {
            Ok(_) => debug!(bucket, "Bucket exists"),
            Err(err) if err.is_not_found() => {
                info!(
                    bucket,
                    region = self.region.as_str(),
                    policy = ?self.policy,
                    "Creating bucket"
                );
                let request = CreateBucket {
                    bucket_key: bucket.to_string(),
                    policy_key: self.policy,
                };
                match self.storage.create_bucket(token, self.region, &request).await {
                    Ok(_) => {}
                    Err(err) if err.is_conflict() => {
                        debug!(bucket, "Bucket created concurrently")
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }

        self.remember(bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aps::InMemoryPlatform;

    fn manager(platform: &Arc<InMemoryPlatform>) -> BucketManager {
        BucketManager::new(platform.clone(), Region::Us, PolicyKey::Persistent)
    }

    #[tokio::test]
    async fn test_creates_missing_bucket_once() {
        let platform = Arc::new(InMemoryPlatform::new());
        let buckets = manager(&platform);

        buckets.ensure_exists("t", "models").await.unwrap();
        buckets.ensure_exists("t", "models").await.unwrap();

        assert!(platform.has_bucket("models"));
        assert_eq!(platform.calls().create_bucket, 1);
        assert_eq!(platform.calls().bucket_details, 1);
    }

    #[tokio::test]
    async fn test_existing_bucket_is_not_created() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.seed_bucket("models");
        let buckets = manager(&platform);

        buckets.ensure_exists("t", "models").await.unwrap();
        assert_eq!(platform.calls().create_bucket, 0);
    }

    #[tokio::test]
    async fn test_separate_managers_create_once() {
        // second manager sees the bucket through the details call
        let platform = Arc::new(InMemoryPlatform::new());
        manager(&platform).ensure_exists("t", "models").await.unwrap();
        manager(&platform).ensure_exists("t", "models").await.unwrap();

        assert_eq!(platform.calls().create_bucket, 1);
        assert_eq!(platform.calls().bucket_details, 2);
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.forbid_bucket("locked");
        let buckets = manager(&platform);

        let err = buckets.ensure_exists("t", "locked").await.unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(platform.calls().create_bucket, 0);

        // failures are not memoised
        let _ = buckets.ensure_exists("t", "locked").await;
        assert_eq!(platform.calls().bucket_details, 2);
    }
}
