use ferrous_forwarder_application::use_cases::DispatchQueryUseCase;
use hickory_proto::op::{Message, MessageType};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns raw inbound queries into raw replies for the UDP and TCP listeners.
pub struct DnsServerHandler {
    use_case: Arc<DispatchQueryUseCase>,
}

impl DnsServerHandler {
    pub fn new(use_case: Arc<DispatchQueryUseCase>) -> Self {
        Self { use_case }
    }

    /// One packed reply per answered question. Malformed input and responses
    /// yield nothing.
    pub async fn handle_raw(&self, bytes: &[u8], client: SocketAddr) -> Vec<Vec<u8>> {
        let request = match Message::from_vec(bytes) {
            Ok(message) => message,
            Err(e) => {
                debug!(client = %client, error = %e, "Dropping malformed query");
                return Vec::new();
            }
        };

        if request.message_type() != MessageType::Query {
            debug!(client = %client, id = request.id(), "Ignoring non-query message");
            return Vec::new();
        }

        debug!(
            client = %client,
            id = request.id(),
            questions = request.queries().len(),
            "Query received"
        );

        self.use_case
            .execute(&request)
            .await
            .into_iter()
            .filter_map(|response| match response.to_vec() {
                Ok(packed) => Some(packed),
                Err(e) => {
                    warn!(
                        client = %client,
                        id = response.id(),
                        error = %e,
                        "Failed to pack response"
                    );
                    None
                }
            })
            .collect()
    }
}
