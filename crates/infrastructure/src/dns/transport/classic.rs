//! Plain DNS over UDP or TCP (RFC 1035 §4.2).

use super::dialer::{Connection, Dialer, Network};
use super::tcp::{read_with_length_prefix, send_with_length_prefix};
use super::TransactionIds;
use async_trait::async_trait;
use ferrous_forwarder_application::ports::{Exchanged, Upstream};
use ferrous_forwarder_domain::{DomainError, UpstreamAddr};
use hickory_proto::op::Message;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct ClassicUpstream {
    name: String,
    network: Network,
    addr: UpstreamAddr,
    dialer: Arc<dyn Dialer>,
    timeout: Duration,
    ids: TransactionIds,
}

impl ClassicUpstream {
    pub fn new(
        network: Network,
        addr: UpstreamAddr,
        dialer: Arc<dyn Dialer>,
        timeout: Duration,
    ) -> Self {
        let scheme = match network {
            Network::Udp => "udp",
            Network::Tcp => "tcp",
        };
        Self {
            name: format!("{}://{}", scheme, addr),
            network,
            addr,
            dialer,
            timeout,
            ids: TransactionIds::new(),
        }
    }

    pub fn udp(addr: UpstreamAddr, dialer: Arc<dyn Dialer>, timeout: Duration) -> Self {
        Self::new(Network::Udp, addr, dialer, timeout)
    }

    pub fn tcp(addr: UpstreamAddr, dialer: Arc<dyn Dialer>, timeout: Duration) -> Self {
        Self::new(Network::Tcp, addr, dialer, timeout)
    }

    async fn bounded<T>(
        &self,
        step: impl Future<Output = io::Result<T>>,
        on_error: impl FnOnce(String, String) -> DomainError,
    ) -> Result<T, DomainError> {
        match tokio::time::timeout(self.timeout, step).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(on_error(self.name.clone(), e.to_string())),
            Err(_) => Err(DomainError::TransportTimeout {
                server: self.name.clone(),
            }),
        }
    }

    async fn round_trip(
        &self,
        connection: Connection,
        packed: &[u8],
    ) -> Result<Vec<u8>, DomainError> {
        let write_failed = |server: String, reason: String| DomainError::TransportWriteFailed { server, reason };
        let read_failed = |server: String, reason: String| DomainError::TransportReadFailed { server, reason };

        match connection {
            Connection::Udp(socket) => {
                self.bounded(socket.send(packed), write_failed).await?;

                let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
                let received = self.bounded(socket.recv(&mut recv_buf), read_failed).await?;
                recv_buf.truncate(received);
                Ok(recv_buf)
            }
            Connection::Tcp(mut stream) => {
                self.bounded(send_with_length_prefix(&mut stream, packed), write_failed)
                    .await?;
                self.bounded(read_with_length_prefix(&mut stream), read_failed)
                    .await
            }
        }
    }
}

#[async_trait]
impl Upstream for ClassicUpstream {
    fn name(&self) -> &str {
        &self.name
    }

    fn uses_https(&self) -> bool {
        false
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

        let connection = self
            .bounded(
                self.dialer.dial(self.network, &self.addr),
                |server: String, reason: String| DomainError::TransportConnectionRefused {
                    server,
                    reason,
                },
            )
            .await?;

        let response_bytes = self.round_trip(connection, &packed).await?;

        let mut response =
            Message::from_vec(&response_bytes).map_err(|e| DomainError::TransportDecodeFailed {
                server: self.name.clone(),
                reason: e.to_string(),
            })?;

        if response.id() != wire_id {
            return Err(DomainError::TransportDecodeFailed {
                server: self.name.clone(),
                reason: format!(
                    "transaction id mismatch: sent {}, got {}",
                    wire_id,
                    response.id()
                ),
            });
        }

        response.set_id(original_id);
        let elapsed = started.elapsed();

        debug!(
            upstream = %self.name,
            response_len = response_bytes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Classic exchange complete"
        );

        Ok(Exchanged { response, elapsed })
    }
}
