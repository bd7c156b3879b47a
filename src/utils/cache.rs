//! Caching of compiled signature transforms

use crate::error::RyxError;
use crate::platform::engine::CompiledTransform;
use moka::future::Cache;
use std::future::Future;
use tracing::debug;
use url::Url;

/// Identity of one compiled transform: the player script plus the
/// signature fingerprint it was built for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub script_url: Url,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(script_url: Url, fingerprint: impl Into<String>) -> Self {
        Self {
            script_url,
            fingerprint: fingerprint.into(),
        }
    }
}

/// Process-wide store of compiled transforms.
///
/// Concurrent requests for a missing key share one in-flight build; the
/// others await its result. Failed builds are not stored.
#[derive(Clone)]
pub struct TransformCache {
    inner: Cache<CacheKey, CompiledTransform>,
}

impl TransformCache {
    /// Create an unbounded cache that never evicts
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    /// Create a cache holding at most `max_capacity` transforms
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Create a cache from an optional capacity, `None` meaning unbounded
    pub fn from_capacity(max_capacity: Option<u64>) -> Self {
        match max_capacity {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    /// Return the transform stored under `key`, running `build` only on a miss
    pub async fn get_or_build<F>(
        &self,
        key: CacheKey,
        build: F,
    ) -> Result<CompiledTransform, RyxError>
    where
        F: Future<Output = Result<CompiledTransform, RyxError>>,
    {
        if let Some(hit) = self.inner.get(&key).await {
            debug!(fingerprint = %key.fingerprint, "Transform cache hit");
            return Ok(hit);
        }

        debug!(
            script = %key.script_url,
            fingerprint = %key.fingerprint,
            "Transform cache miss"
        );
        self.inner
            .try_get_with(key, build)
            .await
            .map_err(RyxError::from_shared)
    }

    /// Look up a transform without building
    pub async fn get(&self, key: &CacheKey) -> Option<CompiledTransform> {
        self.inner.get(key).await
    }

    /// Number of stored transforms, after pending maintenance has run
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::engine::SignatureTransform;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug)]
    struct Reverse;

    #[async_trait]
    impl SignatureTransform for Reverse {
        async fn apply(&self, signature: &str) -> Result<String, RyxError> {
            Ok(signature.chars().rev().collect())
        }
    }

    fn key(fingerprint: &str) -> CacheKey {
        CacheKey::new(
            Url::parse("https://www.youtube.com/s/player/abc/base.js").unwrap(),
            fingerprint,
        )
    }

    async fn counted_build(builds: Arc<AtomicUsize>) -> Result<CompiledTransform, RyxError> {
        builds.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Arc::new(Reverse) as CompiledTransform)
    }

    #[tokio::test]
    async fn test_builder_runs_once_per_key() {
        let cache = TransformCache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_build(key("3.2.1"), counted_build(builds.clone()))
            .await
            .unwrap();
        let second = cache
            .get_or_build(key("3.2.1"), counted_build(builds.clone()))
            .await
            .unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.apply("abc").await.unwrap(), "cba");
    }

    #[tokio::test]
    async fn test_distinct_keys_build_separately() {
        let cache = TransformCache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_build(key("3.2.1"), counted_build(builds.clone()))
            .await
            .unwrap();
        cache
            .get_or_build(key("4.4"), counted_build(builds.clone()))
            .await
            .unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_build() {
        let cache = TransformCache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        let requests = (0..8).map(|_| {
            let cache = cache.clone();
            let builds = builds.clone();
            tokio::spawn(async move {
                cache
                    .get_or_build(key("10.10"), counted_build(builds))
                    .await
                    .map(|_| ())
            })
        });
        for result in futures::future::join_all(requests).await {
            result.unwrap().unwrap();
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_not_stored() {
        let cache = TransformCache::new();
        let result = cache
            .get_or_build(key("1"), async {
                Err(RyxError::TransformLocationFailed("no rule".into()))
            })
            .await;
        assert!(matches!(result, Err(RyxError::TransformLocationFailed(_))));
        assert!(cache.get(&key("1")).await.is_none());

        let builds = Arc::new(AtomicUsize::new(0));
        cache
            .get_or_build(key("1"), counted_build(builds.clone()))
            .await
            .unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_from_capacity() {
        let bounded = TransformCache::from_capacity(Some(4));
        let unbounded = TransformCache::from_capacity(None);
        assert!(bounded.is_empty().await);
        assert!(unbounded.is_empty().await);
    }
}
