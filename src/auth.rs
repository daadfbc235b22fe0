//! Shared two-legged credential cache
//!
//! Tokens are cached per scope set and reused until they come within the
//! refresh margin of expiring. Each scope set has its own lock, held across
//! a refresh so that concurrent callers wait for one fetch instead of each
//! issuing their own. A slow refresh of one scope set never blocks another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::aps::types::{Credentials, ScopeSet};
use crate::aps::{Authenticator, Result};
use crate::observability::Metrics;

type Slot = Arc<Mutex<Option<CachedToken>>>;

#[derive(Debug, Clone)]
struct CachedToken {
    credentials: Credentials,
    expires_at: Instant,
}

impl CachedToken {
    fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

pub struct CredentialCache {
    authenticator: Arc<dyn Authenticator>,
    refresh_margin: Duration,
    slots: std::sync::Mutex<HashMap<ScopeSet, Slot>>,
    metrics: Arc<Metrics>,
}

impl CredentialCache {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        refresh_margin: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            authenticator,
            refresh_margin,
            slots: std::sync::Mutex::new(HashMap::new()),
            metrics,
        }
    }

    fn slot(&self, scopes: ScopeSet) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(scopes).or_default().clone()
    }

    /// Credentials for `scopes`, with `expires_in` counting down from issue
    pub async fn credentials(&self, scopes: ScopeSet) -> Result<Credentials> {
        let slot = self.slot(scopes);
        let mut cached_token = slot.lock().await;
        let now = Instant::now();

        if let Some(cached) = cached_token.as_ref() {
            let remaining = cached.remaining(now);
            if remaining > self.refresh_margin {
                return Ok(Credentials {
                    expires_in: remaining.as_secs(),
                    ..cached.credentials.clone()
                });
            }
        }

        let credentials = self.authenticator.two_legged_token(scopes).await?;
        self.metrics.token_refreshed();
        debug!(?scopes, expires_in = credentials.expires_in, "Refreshed access token");

        *cached_token = Some(CachedToken {
            credentials: credentials.clone(),
            expires_at: now + Duration::from_secs(credentials.expires_in),
        });

        Ok(credentials)
    }

    /// Bearer token for internal platform calls
    pub async fn internal_token(&self) -> Result<String> {
        Ok(self.credentials(ScopeSet::Full).await?.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aps::InMemoryPlatform;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Issues viewer tokens only once the gate is opened
    #[derive(Default)]
    struct GatedAuthenticator {
        viewer_gate: Notify,
    }

    #[async_trait]
    impl Authenticator for GatedAuthenticator {
        async fn two_legged_token(&self, scopes: ScopeSet) -> Result<Credentials> {
            if scopes == ScopeSet::Viewer {
                self.viewer_gate.notified().await;
            }
            Ok(Credentials {
                access_token: format!("{scopes:?}"),
                expires_in: 3600,
                token_type: "Bearer".to_string(),
            })
        }
    }

    fn cache(platform: Arc<InMemoryPlatform>, margin_secs: u64) -> CredentialCache {
        CredentialCache::new(
            platform,
            Duration::from_secs(margin_secs),
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn test_reuses_token_until_near_expiry() {
        let platform = Arc::new(InMemoryPlatform::new());
        let cache = cache(platform.clone(), 60);

        let first = cache.credentials(ScopeSet::Full).await.unwrap();
        let second = cache.credentials(ScopeSet::Full).await.unwrap();

        assert_eq!(first.access_token, second.access_token);
        assert!(second.expires_in <= first.expires_in);
        assert_eq!(platform.calls().tokens, 1);
    }

    #[tokio::test]
    async fn test_scope_sets_are_cached_separately() {
        let platform = Arc::new(InMemoryPlatform::new());
        let cache = cache(platform.clone(), 60);

        let viewer = cache.credentials(ScopeSet::Viewer).await.unwrap();
        let full = cache.credentials(ScopeSet::Full).await.unwrap();

        assert_ne!(viewer.access_token, full.access_token);
        assert_eq!(platform.calls().tokens, 2);
    }

    #[tokio::test]
    async fn test_refreshes_token_inside_margin() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.set_token_ttl(30);
        let cache = cache(platform.clone(), 60);

        let first = cache.internal_token().await.unwrap();
        let second = cache.internal_token().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(platform.calls().tokens, 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let platform = Arc::new(InMemoryPlatform::new());
        let cache = Arc::new(cache(platform.clone(), 60));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.internal_token().await.unwrap() })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(platform.calls().tokens, 1);
    }

    #[tokio::test]
    async fn test_slow_refresh_does_not_block_other_scopes() {
        let authenticator = Arc::new(GatedAuthenticator::default());
        let cache = Arc::new(CredentialCache::new(
            authenticator.clone(),
            Duration::from_secs(60),
            Arc::new(Metrics::new()),
        ));

        let viewer = tokio::spawn({
            let cache = cache.clone();
            async move { cache.credentials(ScopeSet::Viewer).await.unwrap() }
        });
        // let the viewer refresh start and park on the gate
        tokio::task::yield_now().await;

        let full = tokio::time::timeout(Duration::from_secs(5), cache.internal_token())
            .await
            .expect("full-scope token waited on the viewer refresh")
            .unwrap();
        assert_eq!(full, "Full");

        authenticator.viewer_gate.notify_one();
        assert_eq!(viewer.await.unwrap().access_token, "Viewer");
    }
}
