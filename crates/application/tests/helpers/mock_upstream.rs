use async_trait::async_trait;
use ferrous_forwarder_application::ports::{Exchanged, Upstream};
use ferrous_forwarder_domain::DomainError;
use hickory_proto::op::{Message, MessageType, Query};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MockBehavior {
    Answer(Ipv4Addr),
    Fail,
    Delay(Duration, Ipv4Addr),
}

/// Upstream double that answers with its own internal transaction ID so tests
/// can check the dispatcher restores the client's.
pub struct MockUpstream {
    name: String,
    https: bool,
    behavior: MockBehavior,
    internal_id: u16,
    calls: AtomicUsize,
    completed: Arc<AtomicUsize>,
    seen: Mutex<Vec<Message>>,
}

impl MockUpstream {
    pub fn new(name: &str, behavior: MockBehavior) -> Self {
        Self {
            name: name.to_string(),
            https: false,
            behavior,
            internal_id: 0xBEEF,
            calls: AtomicUsize::new(0),
            completed: Arc::new(AtomicUsize::new(0)),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn https(name: &str, behavior: MockBehavior) -> Self {
        Self {
            https: true,
            ..Self::new(name, behavior)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Message> {
        self.seen.lock().unwrap().clone()
    }

    fn answer(&self, query: &Message, ip: Ipv4Addr) -> Message {
        let mut response = query.clone();
        response.set_id(self.internal_id);
        response.set_message_type(MessageType::Response);
        if let Some(q) = query.queries().first() {
            response.add_answer(Record::from_rdata(
                q.name().clone(),
                300,
                RData::A(A(ip)),
            ));
        }
        response
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    fn name(&self) -> &str {
        &self.name
    }

    fn uses_https(&self) -> bool {
        self.https
    }

    async fn exchange(&self, query: &Message) -> Result<Exchanged, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(query.clone());
        let result = match &self.behavior {
            MockBehavior::Answer(ip) => Ok(self.answer(query, *ip)),
            MockBehavior::Fail => Err(DomainError::TransportConnectionRefused {
                server: self.name.clone(),
                reason: "connection refused".to_string(),
            }),
            MockBehavior::Delay(delay, ip) => {
                tokio::time::sleep(*delay).await;
                Ok(self.answer(query, *ip))
            }
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result.map(|response| Exchanged {
            response,
            elapsed: Duration::from_millis(1),
        })
    }
}

pub fn query_message(id: u16, names: &[&str]) -> Message {
    let mut message = Message::new();
    message.set_id(id);
    message.set_recursion_desired(true);
    for name in names {
        message.add_query(Query::query(Name::from_str(name).unwrap(), RecordType::A));
    }
    message
}
