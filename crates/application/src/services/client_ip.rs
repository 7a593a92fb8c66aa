use std::net::{IpAddr, Ipv4Addr};
use std::sync::{PoisonError, RwLock};

/// The public address used for client-subnet annotation.
///
/// Starts at loopback, which the annotator skips, until discovery or a static
/// setting provides a real address.
pub struct ClientIp {
    ip: RwLock<IpAddr>,
}

impl ClientIp {
    pub fn new(initial: IpAddr) -> Self {
        Self {
            ip: RwLock::new(initial),
        }
    }

    pub fn get(&self) -> IpAddr {
        *self.ip.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `ip` and returns the previous address if it differed.
    pub fn set(&self, ip: IpAddr) -> Option<IpAddr> {
        let mut guard = self.ip.write().unwrap_or_else(PoisonError::into_inner);
        if *guard == ip {
            return None;
        }
        let previous = *guard;
        *guard = ip;
        Some(previous)
    }
}

impl Default for ClientIp {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}
