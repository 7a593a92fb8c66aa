use async_trait::async_trait;
use ferrous_forwarder_domain::DomainError;
use hickory_proto::op::Message;
use std::time::Duration;

/// A response plus the wall time the exchange took.
#[derive(Debug, Clone)]
pub struct Exchanged {
    pub response: Message,
    pub elapsed: Duration,
}

/// A resolver the dispatcher can forward a single-question query to.
///
/// Implementations send the query under their own transaction ID and hand the
/// response back carrying the caller's original ID. They never retry; failing
/// over to the next upstream is the dispatcher's job.
#[async_trait]
pub trait Upstream: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the exchange goes over HTTPS (and therefore through the proxy).
    fn uses_https(&self) -> bool;

    async fn exchange(&self, query: &Message) -> Result<Exchanged, DomainError>;
}
