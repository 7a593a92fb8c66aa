use crate::errors::DomainError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// An address plus source prefix length, as carried by the EDNS0 client-subnet option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubnetPrefix {
    pub addr: IpAddr,
    pub prefix: u8,
}

impl SubnetPrefix {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, DomainError> {
        if prefix > max_prefix(&addr) {
            return Err(DomainError::InvalidSubnet(format!(
                "prefix /{} too long for {}",
                prefix, addr
            )));
        }
        Ok(Self { addr, prefix })
    }

    /// Full-length prefix for a single host address.
    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix: max_prefix(&addr),
        }
    }
}

pub fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl FromStr for SubnetPrefix {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, prefix_str) = match s.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };
        let addr: IpAddr = addr_str
            .trim()
            .parse()
            .map_err(|_| DomainError::InvalidSubnet(s.to_string()))?;
        match prefix_str {
            Some(p) => {
                let prefix = p
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| DomainError::InvalidSubnet(s.to_string()))?;
                Self::new(addr, prefix)
            }
            None => Ok(Self::host(addr)),
        }
    }
}

impl fmt::Display for SubnetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}
