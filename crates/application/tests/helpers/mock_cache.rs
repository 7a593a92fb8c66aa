use ferrous_forwarder_application::ports::{CacheStats, ResponseCachePort};
use ferrous_forwarder_domain::Question;
use hickory_proto::op::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub struct MockResponseCache {
    entries: Mutex<HashMap<Question, Message>>,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
}

impl MockResponseCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
        }
    }

    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, question: &Question) -> bool {
        self.entries.lock().unwrap().contains_key(question)
    }
}

impl Default for MockResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCachePort for MockResponseCache {
    fn get(&self, question: &Question) -> Option<Message> {
        let found = self.entries.lock().unwrap().get(question).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::SeqCst),
            None => self.misses.fetch_add(1, Ordering::SeqCst),
        };
        found
    }

    fn put(&self, question: &Question, response: &Message) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(question.clone(), response.clone());
    }

    fn purge(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: usize::MAX,
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
            insertions: self.puts(),
            expirations: 0,
            evictions: 0,
        }
    }
}
