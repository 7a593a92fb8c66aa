use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

#[derive(Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub insertions: AtomicU64,
    /// Entries dropped because their TTL ran out (lazy or swept).
    pub expirations: AtomicU64,
    /// Live entries dropped because the cache was full after a sweep.
    pub evictions: AtomicU64,
}

impl CacheMetrics {
    #[inline]
    pub(super) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, AtomicOrdering::Relaxed);
    }
}
