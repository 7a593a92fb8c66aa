pub mod classic;
pub mod dialer;
pub mod http_client;
pub mod https;
pub mod https_json;
pub mod shadowsocks;
pub mod tcp;

pub use classic::ClassicUpstream;
pub use dialer::{Connection, Dialer, DirectDialer, Network};
pub use http_client::build_https_client;
pub use https::HttpsUpstream;
pub use https_json::HttpsJsonUpstream;

use std::sync::atomic::{AtomicU16, Ordering as AtomicOrdering};

/// Per-upstream source of outgoing transaction IDs.
///
/// Starts at a random value and wraps around; the upstream restores the
/// caller's ID on whatever comes back.
pub struct TransactionIds {
    next: AtomicU16,
}

impl TransactionIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU16::new(fastrand::u16(..)),
        }
    }

    pub fn next_id(&self) -> u16 {
        self.next.fetch_add(1, AtomicOrdering::Relaxed)
    }
}

impl Default for TransactionIds {
    fn default() -> Self {
        Self::new()
    }
}
