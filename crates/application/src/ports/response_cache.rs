use ferrous_forwarder_domain::Question;
use hickory_proto::op::Message;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub expirations: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Share of lookups answered from cache, in percent.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

pub trait ResponseCachePort: Send + Sync {
    /// Owned copy of the live entry for `question`, if any.
    fn get(&self, question: &Question) -> Option<Message>;

    /// Stores or replaces the entry for `question`. Responses that are not
    /// cacheable are ignored.
    fn put(&self, question: &Question, response: &Message);

    fn purge(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}
