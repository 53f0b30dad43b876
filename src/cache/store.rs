//! Shared result cache with lazy expiry and per-fingerprint single-flight

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::clock::{elapsed_between, Clock, SystemClock};
use super::{CacheCategory, Fingerprint, TtlPolicy};
use crate::error::CacheError;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub category: CacheCategory,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        elapsed_between(self.created_at, now)
    }

    /// Expired once strictly older than its TTL
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl
    }
}

/// Storage behind the cache. Errors make the cache fall back to pass-through.
pub trait CacheBackend: Send + Sync {
    fn get(&self, fingerprint: Fingerprint) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace the entry with the same fingerprint
    fn upsert(&self, entry: CacheEntry) -> Result<(), CacheError>;

    fn remove(&self, fingerprint: Fingerprint) -> Result<bool, CacheError>;

    /// Drop every entry for which `keep` is false; returns how many went
    fn retain(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError>;

    fn len(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<Fingerprint, CacheEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, fingerprint: Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.get(&fingerprint).map(|entry| entry.value().clone()))
    }

    fn upsert(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(entry.fingerprint, entry);
        Ok(())
    }

    fn remove(&self, fingerprint: Fingerprint) -> Result<bool, CacheError> {
        Ok(self.entries.remove(&fingerprint).is_some())
    }

    fn retain(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| keep(entry));
        Ok(before.saturating_sub(self.entries.len()))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub evictions: u64,
    pub live_entries: usize,
}

pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    policy: TtlPolicy,
    retention: Duration,
    clock: Arc<dyn Clock>,

    /// One gate per fingerprint with a fetch in progress
    inflight: DashMap<Fingerprint, Arc<Mutex<()>>>,

    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    pub fn new(policy: TtlPolicy) -> Self {
        Self::with_parts(
            Arc::new(MemoryBackend::new()),
            policy,
            Self::DEFAULT_RETENTION,
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        backend: Arc<dyn CacheBackend>,
        policy: TtlPolicy,
        retention: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            "🗃️ Result cache ready: listings TTL {:?}, token detail TTL {:?}, sentiment TTL {:?}, retention {:?}",
            policy.listings, policy.token_detail, policy.sentiment, retention
        );
        Self {
            backend,
            policy,
            retention,
            clock,
            inflight: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    /// Live payload for (category, params), if any
    pub fn lookup<T: DeserializeOwned>(&self, category: CacheCategory, params: &[&str]) -> Option<T> {
        self.peek(Fingerprint::of(category, params))
    }

    /// Store under the category's TTL
    pub fn store<T: Serialize>(&self, category: CacheCategory, params: &[&str], value: &T) {
        let ttl = self.policy.ttl(category);
        self.store_at(Fingerprint::of(category, params), category, ttl, value);
    }

    pub fn invalidate(&self, category: CacheCategory, params: &[&str]) -> bool {
        match self.backend.remove(Fingerprint::of(category, params)) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cache invalidate failed for {}: {}", category, e);
                false
            }
        }
    }

    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        category: CacheCategory,
        params: &[&str],
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ttl = self.policy.ttl(category);
        self.get_or_fetch_with_ttl(category, params, ttl, fetch).await
    }

    /// Return the live payload, or run `fetch` and store its result.
    ///
    /// Concurrent callers for the same fingerprint wait on a per-fingerprint
    /// gate, so only one of them reaches the collaborator; the rest read the
    /// stored result. Failed fetches are not cached.
    pub async fn get_or_fetch_with_ttl<T, E, F, Fut>(
        &self,
        category: CacheCategory,
        params: &[&str],
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let fingerprint = Fingerprint::of(category, params);
        if let Some(value) = self.peek(fingerprint) {
            return Ok(value);
        }

        let gate = self
            .inflight
            .entry(fingerprint)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let guard = gate.lock().await;

        // a concurrent caller may have filled it while we waited
        if let Some(value) = self.peek(fingerprint) {
            drop(guard);
            self.release_gate(fingerprint, &gate);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss for {} [{}], fetching", category, fingerprint);

        let result = fetch().await;
        if let Ok(value) = &result {
            self.store_at(fingerprint, category, ttl, value);
        }

        drop(guard);
        self.release_gate(fingerprint, &gate);
        result
    }

    /// Remove entries older than the retention ceiling, whatever their category
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let retention = self.retention;
        let removed = match self
            .backend
            .retain(&|entry: &CacheEntry| entry.age(now) <= retention)
        {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cache sweep failed: {}", e);
                0
            }
        };
        self.inflight.retain(|_, gate| Arc::strong_count(gate) > 1);
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);

        if removed > 0 {
            info!("🧹 Swept {} cache entries older than {:?}", removed, retention);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            live_entries: self.backend.len(),
        }
    }

    fn peek<T: DeserializeOwned>(&self, fingerprint: Fingerprint) -> Option<T> {
        let entry = match self.backend.get(fingerprint) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed, passing through: {}", e);
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!("Evicting expired {} entry [{}]", entry.category, fingerprint);
            self.evict(fingerprint);
            return None;
        }

        match serde_json::from_value(entry.payload) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {} [{}]", entry.category, fingerprint);
                Some(value)
            }
            Err(e) => {
                warn!("Undecodable {} entry [{}] evicted: {}", entry.category, fingerprint, e);
                self.evict(fingerprint);
                None
            }
        }
    }

    fn store_at<T: Serialize>(
        &self,
        fingerprint: Fingerprint,
        category: CacheCategory,
        ttl: Duration,
        value: &T,
    ) {
        let stored = serde_json::to_value(value)
            .map_err(CacheError::from)
            .and_then(|payload| {
                self.backend.upsert(CacheEntry {
                    fingerprint,
                    category,
                    payload,
                    created_at: self.clock.now(),
                    ttl,
                })
            });

        if let Err(e) = stored {
            warn!("Result for {} not cached: {}", category, e);
        }
    }

    fn evict(&self, fingerprint: Fingerprint) {
        match self.backend.remove(fingerprint) {
            Ok(true) => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(e) => warn!("Cache eviction failed: {}", e),
        }
    }

    fn release_gate(&self, fingerprint: Fingerprint, gate: &Arc<Mutex<()>>) {
        // our clone plus the map's; anything more means someone is waiting
        self.inflight
            .remove_if(&fingerprint, |_, current| {
                Arc::ptr_eq(current, gate) && Arc::strong_count(current) <= 2
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use futures_util::future::join_all;
    use std::sync::atomic::AtomicUsize;

    fn cache_with_clock() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = ResultCache::with_parts(
            Arc::new(MemoryBackend::new()),
            TtlPolicy::default(),
            ResultCache::DEFAULT_RETENTION,
            clock.clone(),
        );
        (cache, clock)
    }

    async fn counted_fetch(calls: &AtomicUsize, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_identical_requests_fetch_once_within_ttl() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch(CacheCategory::Listings, &["trending"], || counted_fetch(&calls, 7))
            .await;
        clock.advance(Duration::from_secs(299));
        let second = cache
            .get_or_fetch(CacheCategory::Listings, &["trending"], || counted_fetch(&calls, 8))
            .await;

        assert_eq!(first, Ok(7));
        assert_eq!(second, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.live_entries, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_returned() {
        let (cache, clock) = cache_with_clock();
        cache.store(CacheCategory::Listings, &["trending"], &1u32);

        clock.advance(Duration::from_secs(300));
        assert_eq!(cache.lookup::<u32>(CacheCategory::Listings, &["trending"]), Some(1));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.lookup::<u32>(CacheCategory::Listings, &["trending"]), None);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.stats().live_entries, 0);
    }

    #[tokio::test]
    async fn test_categories_expire_independently() {
        let (cache, clock) = cache_with_clock();
        cache.store(CacheCategory::Listings, &["x"], &"listing");
        cache.store(CacheCategory::Sentiment, &["x"], &"verdict");

        clock.advance(Duration::from_secs(10 * 60));
        assert_eq!(cache.lookup::<String>(CacheCategory::Listings, &["x"]), None);
        assert_eq!(
            cache.lookup::<String>(CacheCategory::Sentiment, &["x"]),
            Some("verdict".to_string())
        );
    }

    #[tokio::test]
    async fn test_explicit_ttl_overrides_category_default() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);
        let short = Duration::from_secs(30);

        cache
            .get_or_fetch_with_ttl(CacheCategory::Sentiment, &["a"], short, || counted_fetch(&calls, 1))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(31));
        cache
            .get_or_fetch_with_ttl(CacheCategory::Sentiment, &["a"], short, || counted_fetch(&calls, 2))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let failed: Result<u32, String> = cache
            .get_or_fetch(CacheCategory::TokenDetail, &["mint"], || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("upstream 502".to_string())
            })
            .await;
        assert!(failed.is_err());

        let recovered = cache
            .get_or_fetch(CacheCategory::TokenDetail, &["mint"], || counted_fetch(&calls, 3))
            .await;
        assert_eq!(recovered, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_fetches_are_coalesced() {
        let cache = ResultCache::new(TtlPolicy::default());
        let calls = AtomicUsize::new(0);

        let requests = (0..8).map(|_| {
            cache.get_or_fetch(CacheCategory::Sentiment, &["same"], || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, String>(42u32)
            })
        });
        let results = join_all(requests).await;

        assert!(results.iter().all(|r| *r == Ok(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.inflight.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_applies_retention_ceiling() {
        let (cache, clock) = cache_with_clock();
        cache.store(CacheCategory::Sentiment, &["old"], &1u8);
        clock.advance(Duration::from_secs(6 * 24 * 3600));
        cache.store(CacheCategory::Sentiment, &["new"], &2u8);
        clock.advance(Duration::from_secs(2 * 24 * 3600));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.stats().live_entries, 1);
    }

    struct UnavailableBackend;

    impl CacheBackend for UnavailableBackend {
        fn get(&self, _: Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Unavailable("disk detached".into()))
        }
        fn upsert(&self, _: CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("disk detached".into()))
        }
        fn remove(&self, _: Fingerprint) -> Result<bool, CacheError> {
            Err(CacheError::Unavailable("disk detached".into()))
        }
        fn retain(&self, _: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError> {
            Err(CacheError::Unavailable("disk detached".into()))
        }
        fn len(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn test_unavailable_storage_degrades_to_pass_through() {
        let cache = ResultCache::with_parts(
            Arc::new(UnavailableBackend),
            TtlPolicy::default(),
            ResultCache::DEFAULT_RETENTION,
            Arc::new(SystemClock),
        );
        let calls = AtomicUsize::new(0);

        for expected in [5u32, 6] {
            let value = cache
                .get_or_fetch(CacheCategory::Listings, &["trending"], || counted_fetch(&calls, expected))
                .await;
            assert_eq!(value, Ok(expected));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.sweep(), 0);
    }
}
