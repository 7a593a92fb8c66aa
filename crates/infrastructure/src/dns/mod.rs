pub mod cache;
pub mod handler;
pub mod transport;
pub mod upstream_factory;

pub use cache::ResponseCache;
pub use handler::DnsServerHandler;
pub use upstream_factory::{build_router, UpstreamFactory};
