//! Request memoization with absolute TTL plus in-flight de-duplication.

use super::key::CacheKey;
use crate::clock::{system_clock, Clock};
use crate::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Freshness window for resolved requests.
pub const DEFAULT_REQUEST_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A resolved value and the instant (epoch ms) after which it is stale.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at > now_ms
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub failures: u64,
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> RequestCacheStats {
        RequestCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

type SharedResult<V> = Shared<BoxFuture<'static, Result<V>>>;

struct Inner<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, CacheEntry<V>>>,
    // Lock order: `in_flight` before `entries`.
    in_flight: Mutex<HashMap<CacheKey, SharedResult<V>>>,
    stats: AtomicStats,
}

impl<V> Inner<V> {
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, SharedResult<V>>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Per-request memoization (absolute TTL from completion) with coalescing of
/// concurrent identical requests onto a single upstream call.
///
/// Failures are never cached; every caller waiting on a failed call receives the
/// same error.
pub struct RequestCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for RequestCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                clock,
                entries: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                stats: AtomicStats::default(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return the live cached value for `key`, join an identical in-flight call,
    /// or start `compute` and share its outcome.
    ///
    /// `compute` is only invoked when neither a live entry nor an in-flight call
    /// exists. The upstream call runs on its own task, so it settles (and the
    /// in-flight entry is cleared) even if every caller stops waiting.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.inner.in_flight();

            let now = self.inner.clock.now_ms();
            if let Some(entry) = self.inner.entries().get(&key) {
                if entry.is_live(now) {
                    self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(entry.value.clone());
                }
            }

            if let Some(pending) = in_flight.get(&key) {
                self.inner.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "joining in-flight request");
                pending.clone()
            } else {
                self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
                let shared = self.settle(key.clone(), compute()).boxed().shared();
                in_flight.insert(key, shared.clone());
                tokio::spawn(shared.clone());
                shared
            }
        };
        shared.await
    }

    fn settle(
        &self,
        key: CacheKey,
        upstream: impl Future<Output = Result<V>> + Send + 'static,
    ) -> impl Future<Output = Result<V>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        async move {
            let result = upstream.await;
            let mut in_flight = inner.in_flight();
            match &result {
                Ok(value) => {
                    let expires_at = inner
                        .clock
                        .now_ms()
                        .saturating_add(inner.ttl.as_millis() as u64);
                    inner.entries().insert(
                        key.clone(),
                        CacheEntry {
                            value: value.clone(),
                            expires_at,
                        },
                    );
                }
                Err(e) => {
                    inner.stats.failures.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, error = %e, "upstream request failed; not cached");
                }
            }
            in_flight.remove(&key);
            result
        }
    }

    /// Live cached value for `key`, if any. Never triggers an upstream call.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        let now = self.inner.clock.now_ms();
        self.inner
            .entries()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.entries().remove(key).is_some()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now_ms();
        let mut entries = self.inner.entries();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.inner.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight().len()
    }

    pub fn stats(&self) -> RequestCacheStats {
        self.inner.stats.to_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RequestKind;
    use crate::clock::ManualClock;
    use crate::Error;
    use std::sync::atomic::AtomicUsize;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(RequestKind::Article, s)
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_share_one_call() {
        let cache: RequestCache<String> = RequestCache::new(DEFAULT_REQUEST_TTL);
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key("same"), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok::<_, Error>("value".to_string())
                    })
                    .await
            }));
        }

        while cache.stats().coalesced < 4 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), "value");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight_len(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_failure_reaches_every_caller_and_is_not_cached() {
        let cache: RequestCache<u32> = RequestCache::new(DEFAULT_REQUEST_TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err::<u32, _>(Error::network("boom", None, Some(503)))
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_compute(key("k"), make(Arc::clone(&calls))),
            cache.get_or_compute(key("k"), make(Arc::clone(&calls))),
        );
        assert!(a.unwrap_err().is_network_error());
        assert!(b.unwrap_err().is_network_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.in_flight_len(), 0);

        // A later call starts fresh.
        let ok = cache
            .get_or_compute(key("k"), || async { Ok::<_, Error>(7) })
            .await
            .unwrap();
        assert_eq!(ok, 7);
    }

    #[tokio::test]
    async fn test_ttl_is_strict() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let ttl = DEFAULT_REQUEST_TTL;
        let cache: RequestCache<u32> = RequestCache::with_clock(ttl, clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let compute = |calls: Arc<AtomicUsize>| {
            move || async move { Ok::<_, Error>(calls.fetch_add(1, Ordering::SeqCst) as u32) }
        };

        assert_eq!(cache.get_or_compute(key("t"), compute(calls.clone())).await.unwrap(), 0);

        clock.advance(ttl - Duration::from_millis(1));
        assert_eq!(cache.get_or_compute(key("t"), compute(calls.clone())).await.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(1));
        assert!(cache.peek(&key("t")).is_none());
        assert_eq!(cache.get_or_compute(key("t"), compute(calls.clone())).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_entry() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: RequestCache<&'static str> =
            RequestCache::with_clock(Duration::from_secs(10), clock.clone());
        cache
            .get_or_compute(key("r"), || async { Ok::<_, Error>("old") })
            .await
            .unwrap();
        clock.advance(Duration::from_secs(10));
        let v = cache
            .get_or_compute(key("r"), || async { Ok::<_, Error>("new") })
            .await
            .unwrap();
        assert_eq!(v, "new");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&key("r")), Some("new"));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let cache: RequestCache<u32> = RequestCache::new(DEFAULT_REQUEST_TTL);
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        let c2 = calls.clone();
        let (a, b) = tokio::join!(
            cache.get_or_compute(key("a"), move || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(1)
            }),
            cache.get_or_compute(key("b"), move || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(2)
            }),
        );
        assert_eq!((a.unwrap(), b.unwrap()), (1, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: RequestCache<u32> = RequestCache::with_clock(Duration::from_secs(1), clock.clone());
        cache.get_or_compute(key("x"), || async { Ok::<_, Error>(1) }).await.unwrap();
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }
}
