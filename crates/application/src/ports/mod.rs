mod public_ip;
mod response_cache;
mod upstream;

pub use public_ip::PublicIpLookup;
pub use response_cache::{CacheStats, ResponseCachePort};
pub use upstream::{Exchanged, Upstream};
