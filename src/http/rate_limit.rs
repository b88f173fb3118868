use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-adapter rate limiter, shared by every document adapter instance that
/// targets the same external system. §5 requires a concurrency/rate cap per
/// adapter so one tenant's fan-out doesn't exhaust another's quota.
#[derive(Debug, Clone)]
pub struct AdapterRateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl AdapterRateLimiter {
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second.max(1)).unwrap())
            .allow_burst(NonZeroU32::new(burst.max(1)).unwrap());
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Block until a request slot is available, with up to 100ms of jitter
    /// to avoid synchronized retries across candidates.
    pub async fn acquire(&self) {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;
    }
}

/// TTL response cache used for `Workspace` row caching (§5: "read-mostly and
/// cached per request") and for document-adapter fetch results that are
/// re-read across pipeline stages within one candidate's advancement.
#[derive(Debug, Clone)]
pub struct ResponseCache<V: Clone + Send + Sync + 'static> {
    cache: Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> ResponseCache<V> {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let hit = self.cache.get(key).await;
        if hit.is_some() {
            debug!(key, "cache hit");
            crate::observability::pipeline_metrics().record_cache_hit();
        } else {
            crate::observability::pipeline_metrics().record_cache_miss();
        }
        hit
    }

    pub async fn insert(&self, key: String, value: V) {
        self.cache.insert(key, value).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
