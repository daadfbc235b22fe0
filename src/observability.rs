//! Tracing setup and process counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, honouring `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    objects_uploaded: AtomicU64,
    translations_submitted: AtomicU64,
    token_refreshes: AtomicU64,
    upstream_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_uploaded(&self) {
        self.objects_uploaded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "objects_uploaded", "Metric incremented");
    }

    pub fn translation_submitted(&self) {
        self.translations_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "translations_submitted", "Metric incremented");
    }

    pub fn token_refreshed(&self) {
        self.token_refreshes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "token_refreshes", "Metric incremented");
    }

    pub fn upstream_failed(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "upstream_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            objects_uploaded: self.objects_uploaded.load(Ordering::Relaxed),
            translations_submitted: self.translations_submitted.load(Ordering::Relaxed),
            token_refreshes: self.token_refreshes.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub objects_uploaded: u64,
    pub translations_submitted: u64,
    pub token_refreshes: u64,
    pub upstream_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = Metrics::new();
        metrics.object_uploaded();
        metrics.object_uploaded();
        metrics.upstream_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.objects_uploaded, 2);
        assert_eq!(snapshot.upstream_failures, 1);
        assert_eq!(snapshot.translations_submitted, 0);
    }
}
