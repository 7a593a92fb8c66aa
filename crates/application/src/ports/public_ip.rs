use async_trait::async_trait;
use ferrous_forwarder_domain::DomainError;
use std::net::IpAddr;

/// Source of this host's public address.
#[async_trait]
pub trait PublicIpLookup: Send + Sync {
    async fn lookup(&self) -> Result<IpAddr, DomainError>;
}
