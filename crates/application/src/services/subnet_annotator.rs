use ferrous_forwarder_domain::SubnetPrefix;
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsCode, EdnsOption};
use std::sync::Arc;

use super::client_ip::ClientIp;

/// Adds an EDNS0 client-subnet option to `message` unless one is already there.
///
/// An existing OPT record is reused. Loopback and unspecified addresses are
/// never annotated. Returns whether an option was added.
pub fn annotate_client_subnet(message: &mut Message, subnet: SubnetPrefix) -> bool {
    if subnet.addr.is_loopback() || subnet.addr.is_unspecified() {
        return false;
    }

    let edns = message.extensions_mut().get_or_insert_with(Edns::new);
    if edns.option(EdnsCode::Subnet).is_some() {
        return false;
    }

    edns.options_mut().insert(EdnsOption::Subnet(ClientSubnet::new(
        subnet.addr,
        subnet.prefix,
        0,
    )));
    true
}

/// Where the annotated subnet comes from.
pub enum SubnetSource {
    /// The discovered public IP, sent with a full-length prefix.
    Detected(Arc<ClientIp>),
    /// An operator-chosen subnet from configuration.
    Fixed(SubnetPrefix),
}

pub struct SubnetAnnotator {
    source: SubnetSource,
}

impl SubnetAnnotator {
    pub fn new(source: SubnetSource) -> Self {
        Self { source }
    }

    pub fn current(&self) -> SubnetPrefix {
        match &self.source {
            SubnetSource::Detected(client_ip) => SubnetPrefix::host(client_ip.get()),
            SubnetSource::Fixed(subnet) => *subnet,
        }
    }

    pub fn annotate(&self, message: &mut Message) -> bool {
        annotate_client_subnet(message, self.current())
    }
}
