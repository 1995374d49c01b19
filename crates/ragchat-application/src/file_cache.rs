//! Time-bounded cache of derived file-access URLs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use ragchat_core::service::FileAccessApi;

/// How long a resolved URL may be served from the cache.
pub const FILE_URL_TTL: Duration = Duration::from_secs(300);

type CacheKey = (String, String);

#[derive(Clone)]
struct CacheEntry {
    url: String,
    fetched_at: Instant,
}

/// Maps a (source locator, display name) pair to a short-lived access
/// URL, avoiding redundant round-trips to the file access service.
///
/// Expired entries are treated as absent and re-fetched, never served
/// stale. Concurrent misses for the same key collapse into a single
/// fetch; the file access service being unconfigured short-circuits
/// every resolution to `None` without any network I/O.
pub struct FileUrlCache {
    api: Option<Arc<dyn FileAccessApi>>,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    inflight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl FileUrlCache {
    pub fn new(api: Option<Arc<dyn FileAccessApi>>) -> Self {
        Self::with_ttl(api, FILE_URL_TTL)
    }

    pub fn with_ttl(api: Option<Arc<dyn FileAccessApi>>, ttl: Duration) -> Self {
        Self {
            api,
            ttl,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a file-access URL, serving from the cache while the
    /// entry is younger than the TTL.
    ///
    /// `None` means "link unavailable": the caller displays the
    /// citation as plain text, not as an error state.
    pub async fn resolve(
        &self,
        source_uri: &str,
        document_name: &str,
        token: &str,
    ) -> Option<String> {
        let api = self.api.as_ref()?;
        let key = (source_uri.to_string(), document_name.to_string());

        if let Some(url) = self.fresh_url(&key).await {
            return Some(url);
        }

        // Single-flight per key: concurrent misses wait for the first
        // fetch instead of fanning out duplicate requests.
        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        // Another flight may have populated the entry while we waited.
        if let Some(url) = self.fresh_url(&key).await {
            self.finish_flight(&key).await;
            return Some(url);
        }

        let fetched = api.file_url(source_uri, document_name, token).await;
        let result = match fetched {
            Ok(url) => {
                let mut entries = self.entries.write().await;
                entries.insert(
                    key.clone(),
                    CacheEntry {
                        url: url.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Some(url)
            }
            Err(err) => {
                tracing::debug!(error = %err, source_uri, "file url resolution failed");
                None
            }
        };

        self.finish_flight(&key).await;
        result
    }

    /// Drops all cached URLs.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn fresh_url(&self, key: &CacheKey) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.url.clone())
    }

    async fn finish_flight(&self, key: &CacheKey) {
        let mut inflight = self.inflight.lock().await;
        inflight.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragchat_core::error::{Result, ServiceError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApi {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingApi {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FileAccessApi for CountingApi {
        async fn file_url(
            &self,
            source_uri: &str,
            _document_name: &str,
            _token: &str,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ServiceError::Server { status: 500 });
            }
            Ok(format!("https://signed.example.com/{source_uri}"))
        }
    }

    #[tokio::test]
    async fn second_resolve_within_ttl_hits_the_cache() {
        let api = Arc::new(CountingApi::new());
        let cache = FileUrlCache::new(Some(api.clone()));

        let first = cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await;
        let second = cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await;

        assert_eq!(first, second);
        assert!(first.is_some());
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched_not_served_stale() {
        let api = Arc::new(CountingApi::new());
        let cache = FileUrlCache::with_ttl(Some(api.clone()), Duration::ZERO);

        cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await;
        cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await;

        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn distinct_keys_are_cached_independently() {
        let api = Arc::new(CountingApi::new());
        let cache = FileUrlCache::new(Some(api.clone()));

        cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await;
        cache.resolve("s3://docs/a.pdf", "copy.pdf", "tok").await;

        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_none() {
        let mut api = CountingApi::new();
        api.fail = true;
        let api = Arc::new(api);
        let cache = FileUrlCache::new(Some(api.clone()));

        assert_eq!(cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await, None);
        // A failure is not cached; the next call retries.
        assert_eq!(cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await, None);
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn unconfigured_service_short_circuits_to_none() {
        let cache = FileUrlCache::new(None);
        assert_eq!(cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await, None);
    }

    #[tokio::test]
    async fn clear_drops_cached_entries() {
        let api = Arc::new(CountingApi::new());
        let cache = FileUrlCache::new(Some(api.clone()));

        cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await;
        cache.clear().await;
        cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await;

        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_collapse_to_one_fetch() {
        let api = Arc::new(CountingApi::new());
        let cache = Arc::new(FileUrlCache::new(Some(api.clone())));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache.resolve("s3://docs/a.pdf", "a.pdf", "tok").await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }
        assert_eq!(api.calls(), 1);
    }
}
