mod dns;

pub use dns::{bind_dns_sockets, run_dns_server, DnsSockets};
