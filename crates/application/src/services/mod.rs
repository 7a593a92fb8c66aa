mod client_ip;
mod domain_router;
mod subnet_annotator;

pub use client_ip::ClientIp;
pub use domain_router::{DomainRouter, RouteList};
pub use subnet_annotator::{annotate_client_subnet, SubnetAnnotator, SubnetSource};
