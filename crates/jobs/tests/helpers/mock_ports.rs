use async_trait::async_trait;
use ferrous_forwarder_application::ports::{CacheStats, PublicIpLookup, ResponseCachePort};
use ferrous_forwarder_domain::{DomainError, Question};
use hickory_proto::op::Message;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Replays scripted lookup results; repeats the last one when exhausted.
pub struct MockPublicIpLookup {
    script: Mutex<VecDeque<Result<IpAddr, DomainError>>>,
    last: Mutex<Option<Result<IpAddr, DomainError>>>,
    call_count: AtomicU64,
}

impl MockPublicIpLookup {
    pub fn new(script: Vec<Result<IpAddr, DomainError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            call_count: AtomicU64::new(0),
        }
    }

    pub fn returning(ip: &str) -> Self {
        Self::new(vec![Ok(ip.parse().unwrap())])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(DomainError::TransportTimeout {
            server: "mock".to_string(),
        })])
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublicIpLookup for MockPublicIpLookup {
    async fn lookup(&self) -> Result<IpAddr, DomainError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(result) = next {
            *last = Some(result);
        }
        last.clone().unwrap_or_else(|| {
            Err(DomainError::IoError("no scripted result".to_string()))
        })
    }
}

/// Cache that only counts purges.
#[derive(Default)]
pub struct MockResponseCache {
    purges: AtomicU64,
}

impl MockResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn purge_count(&self) -> u64 {
        self.purges.load(Ordering::SeqCst)
    }
}

impl ResponseCachePort for MockResponseCache {
    fn get(&self, _question: &Question) -> Option<Message> {
        None
    }

    fn put(&self, _question: &Question, _response: &Message) {}

    fn purge(&self) {
        self.purges.fetch_add(1, Ordering::SeqCst);
    }

    fn len(&self) -> usize {
        0
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}
