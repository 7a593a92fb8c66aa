//! DNS-over-HTTPS with wire-format bodies (RFC 8484).
//!
//! ```text
//! POST /dns-query HTTP/2
//! Content-Type: application/dns-message
//! Accept: application/dns-message
//!
//! <raw DNS message bytes>
//! ```

use super::TransactionIds;
use async_trait::async_trait;
use ferrous_forwarder_application::ports::{Exchanged, Upstream};
use ferrous_forwarder_domain::DomainError;
use hickory_proto::op::Message;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Expected content type for DNS-over-HTTPS responses (RFC 8484 §4.2.1)
const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

pub struct HttpsUpstream {
    url: Arc<str>,
    client: reqwest::Client,
    ids: TransactionIds,
}

impl HttpsUpstream {
    pub fn new(url: Arc<str>, client: reqwest::Client) -> Self {
        Self {
            url,
            client,
            ids: TransactionIds::new(),
        }
    }

    fn request_failed(&self, e: reqwest::Error) -> DomainError {
        if e.is_timeout() {
            DomainError::TransportTimeout {
                server: self.url.to_string(),
            }
        } else if e.is_connect() {
            DomainError::TransportConnectionRefused {
                server: self.url.to_string(),
                reason: e.to_string(),
            }
        } else {
            DomainError::TransportReadFailed {
                server: self.url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Upstream for HttpsUpstream {
    fn name(&self) -> &str {
        &self.url
    }

    fn uses_https(&self) -> bool {
        true
    }

    async fn exchange(&self, query: &Message) -> Result<Exchanged, DomainError> {
        let started = Instant::now();
        let original_id = query.id();
        let wire_id = self.ids.next_id();

        let mut outgoing = query.clone();
        outgoing.set_id(wire_id);
        let packed = outgoing
            .to_vec()
            .map_err(|e| DomainError::InvalidDnsResponse(format!("failed to pack query: {}", e)))?;

        debug!(url = %self.url, message_len = packed.len(), "Sending DoH query");

        let response = self
            .client
            .post(&*self.url)
            .header(reqwest::header::CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, DNS_MESSAGE_CONTENT_TYPE)
            .body(packed)
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DomainError::TransportHttpStatus {
                server: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_failed(e))?;

        let mut answer =
            Message::from_vec(&body).map_err(|e| DomainError::TransportDecodeFailed {
                server: self.url.to_string(),
                reason: e.to_string(),
            })?;
        answer.set_id(original_id);

        let elapsed = started.elapsed();
        debug!(
            url = %self.url,
            response_len = body.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "DoH response received"
        );

        Ok(Exchanged {
            response: answer,
            elapsed,
        })
    }
}
