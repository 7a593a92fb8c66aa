pub mod metrics;
pub mod ttl;

pub use metrics::CacheMetrics;
pub use ttl::cacheable_ttl;

use ferrous_forwarder_application::ports::{CacheStats, ResponseCachePort};
use ferrous_forwarder_domain::Question;
use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const NIL: usize = usize::MAX;

struct Node {
    question: Question,
    response: Message,
    expires_at: Instant,
    prev: usize,
    next: usize,
}

/// Slots linked in insertion-or-refresh order; head is the oldest.
struct CacheStore {
    index: FxHashMap<Question, usize>,
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl CacheStore {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn node(&self, slot: usize) -> Option<&Node> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = match self.node(slot) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match self.node_mut(prev) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match self.node_mut(next) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(slot) {
            node.prev = old_tail;
            node.next = NIL;
        }
        match self.node_mut(old_tail) {
            Some(tail_node) => tail_node.next = slot,
            None => self.head = slot,
        }
        self.tail = slot;
    }

    fn remove(&mut self, slot: usize) -> Option<Node> {
        self.unlink(slot);
        let node = self.slots.get_mut(slot)?.take()?;
        self.index.remove(&node.question);
        self.free.push(slot);
        Some(node)
    }

    fn upsert(&mut self, question: &Question, response: Message, expires_at: Instant) {
        if let Some(&slot) = self.index.get(question) {
            self.unlink(slot);
            if let Some(node) = self.node_mut(slot) {
                node.response = response;
                node.expires_at = expires_at;
            }
            self.push_back(slot);
            return;
        }

        let node = Node {
            question: question.clone(),
            response,
            expires_at,
            prev: NIL,
            next: NIL,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(question.clone(), slot);
        self.push_back(slot);
    }

    /// Drops every expired entry, walking from the oldest. Returns how many
    /// were removed.
    fn sweep_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        let mut cursor = self.head;
        while let Some(node) = self.node(cursor) {
            let next = node.next;
            if node.expires_at <= now {
                self.remove(cursor);
                removed += 1;
            }
            cursor = next;
        }
        removed
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }
}

/// TTL-bounded response cache keyed by question.
///
/// Entries keep the order they were last written in. When a write finds the
/// cache at capacity, expired entries are swept first; if it is still over
/// capacity the oldest live entries are evicted.
pub struct ResponseCache {
    store: RwLock<CacheStore>,
    capacity: usize,
    negative_ttl_cap: u32,
    metrics: CacheMetrics,
}

impl ResponseCache {
    pub fn new(capacity: usize, negative_ttl_cap: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            store: RwLock::new(CacheStore::with_capacity(capacity)),
            capacity,
            negative_ttl_cap,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Whether a live entry exists, without touching the hit counters.
    pub fn contains(&self, question: &Question) -> bool {
        let store = self.read();
        store
            .index
            .get(question)
            .and_then(|&slot| store.node(slot))
            .is_some_and(|node| node.expires_at > Instant::now())
    }

    /// Stored questions from oldest to newest, expired ones included.
    pub fn ordered_questions(&self) -> Vec<Question> {
        let store = self.read();
        let mut questions = Vec::with_capacity(store.len());
        let mut cursor = store.head;
        while let Some(node) = store.node(cursor) {
            questions.push(node.question.clone());
            cursor = node.next;
        }
        questions
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheStore> {
        self.store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheStore> {
        self.store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Re-checks an entry seen expired under the shared lock. Removes it if it
    /// is still expired, otherwise returns the value a concurrent write left.
    fn expire(&self, question: &Question, now: Instant) -> Option<Message> {
        let mut store = self.write();
        let slot = *store.index.get(question)?;
        let node = store.node(slot)?;
        if node.expires_at > now {
            return Some(node.response.clone());
        }
        store.remove(slot);
        CacheMetrics::bump(&self.metrics.expirations, 1);
        None
    }
}

impl ResponseCachePort for ResponseCache {
    fn get(&self, question: &Question) -> Option<Message> {
        let now = Instant::now();
        {
            let store = self.read();
            if let Some(node) = store.index.get(question).and_then(|&slot| store.node(slot)) {
                if node.expires_at > now {
                    CacheMetrics::bump(&self.metrics.hits, 1);
                    return Some(node.response.clone());
                }
            } else {
                CacheMetrics::bump(&self.metrics.misses, 1);
                return None;
            }
        }

        match self.expire(question, now) {
            Some(refreshed) => {
                CacheMetrics::bump(&self.metrics.hits, 1);
                Some(refreshed)
            }
            None => {
                CacheMetrics::bump(&self.metrics.misses, 1);
                None
            }
        }
    }

    fn put(&self, question: &Question, response: &Message) {
        let Some(ttl) = cacheable_ttl(response, self.negative_ttl_cap) else {
            debug!(question = %question, "Response not cacheable");
            return;
        };

        let now = Instant::now();
        let expires_at = now + Duration::from_secs(u64::from(ttl));
        let mut store = self.write();

        store.upsert(question, response.clone(), expires_at);
        CacheMetrics::bump(&self.metrics.insertions, 1);

        if store.len() >= self.capacity {
            let swept = store.sweep_expired(now);
            if swept > 0 {
                CacheMetrics::bump(&self.metrics.expirations, swept as u64);
                debug!(swept, "Swept expired cache entries");
            }
        }

        while store.len() > self.capacity {
            let oldest = store.head;
            if store.remove(oldest).is_none() {
                break;
            }
            CacheMetrics::bump(&self.metrics.evictions, 1);
        }
    }

    fn purge(&self) {
        let mut store = self.write();
        let dropped = store.len();
        store.clear();
        debug!(dropped, "Response cache purged");
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.metrics.hits.load(AtomicOrdering::Relaxed),
            misses: self.metrics.misses.load(AtomicOrdering::Relaxed),
            insertions: self.metrics.insertions.load(AtomicOrdering::Relaxed),
            expirations: self.metrics.expirations.load(AtomicOrdering::Relaxed),
            evictions: self.metrics.evictions.load(AtomicOrdering::Relaxed),
        }
    }
}
