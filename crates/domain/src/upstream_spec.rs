use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_DNS_PORT: u16 = 53;

/// Endpoint of the built-in DoH-JSON upstream selected by the `default` token.
pub const DEFAULT_DOH_JSON_URL: &str = "https://dns.google.com/resolve";

/// Host of [`DEFAULT_DOH_JSON_URL`]. Always treated as a loop domain.
pub const DEFAULT_DOH_JSON_HOST: &str = "dns.google.com";

/// Represents an upstream server address that may or may not be resolved to an IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpstreamAddr {
    Resolved(SocketAddr),
    Unresolved { hostname: Arc<str>, port: u16 },
}

impl UpstreamAddr {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            UpstreamAddr::Resolved(addr) => Some(*addr),
            UpstreamAddr::Unresolved { .. } => None,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            UpstreamAddr::Resolved(addr) => addr.port(),
            UpstreamAddr::Unresolved { port, .. } => *port,
        }
    }

    pub fn hostname_str(&self) -> Option<&str> {
        match self {
            UpstreamAddr::Resolved(_) => None,
            UpstreamAddr::Unresolved { hostname, .. } => Some(hostname),
        }
    }
}

impl fmt::Display for UpstreamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamAddr::Resolved(addr) => write!(f, "{}", addr),
            UpstreamAddr::Unresolved { hostname, port } => write!(f, "{}:{}", hostname, port),
        }
    }
}

/// One comma-separated token of a `mapping` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpstreamSpec {
    /// The built-in DoH-JSON resolver.
    Default,
    Udp {
        addr: UpstreamAddr,
    },
    Tcp {
        addr: UpstreamAddr,
    },
    /// DoH with wire-format bodies.
    Https {
        url: Arc<str>,
        hostname: Arc<str>,
    },
    /// DoH against a JSON resolve endpoint.
    HttpsJson {
        url: Arc<str>,
        hostname: Arc<str>,
    },
}

impl UpstreamSpec {
    pub fn protocol_name(&self) -> &'static str {
        match self {
            UpstreamSpec::Default | UpstreamSpec::HttpsJson { .. } => "HTTPS-JSON",
            UpstreamSpec::Udp { .. } => "UDP",
            UpstreamSpec::Tcp { .. } => "TCP",
            UpstreamSpec::Https { .. } => "HTTPS",
        }
    }

    pub fn uses_https(&self) -> bool {
        !matches!(self, UpstreamSpec::Udp { .. } | UpstreamSpec::Tcp { .. })
    }

    pub fn hostname(&self) -> Option<&str> {
        match self {
            UpstreamSpec::Default => Some(DEFAULT_DOH_JSON_HOST),
            UpstreamSpec::Https { hostname, .. } | UpstreamSpec::HttpsJson { hostname, .. } => {
                Some(hostname)
            }
            UpstreamSpec::Udp { addr } | UpstreamSpec::Tcp { addr } => addr.hostname_str(),
        }
    }

    /// Parses a comma-separated mapping value, ignoring empty tokens.
    pub fn parse_list(value: &str) -> Result<Vec<UpstreamSpec>, String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for UpstreamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamSpec::Default => write!(f, "default"),
            UpstreamSpec::Udp { addr } => write!(f, "udp://{}", addr),
            UpstreamSpec::Tcp { addr } => write!(f, "tcp://{}", addr),
            UpstreamSpec::Https { url, .. } => write!(f, "{}", url),
            UpstreamSpec::HttpsJson { url, .. } => write!(f, "json+{}", url),
        }
    }
}

/// Splits `host[:port]`, accepting bracketed IPv6. A missing port is `None`.
fn parse_host_port(s: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = s.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        let tail = &rest[end + 1..];
        if tail.is_empty() {
            return Some((host, None));
        }
        let port = tail.strip_prefix(':')?.parse::<u16>().ok()?;
        return Some((host, Some(port)));
    }
    match s.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str.parse::<u16>().ok()?;
            Some((host, Some(port)))
        }
        None => Some((s, None)),
    }
}

fn parse_upstream_addr(addr_str: &str) -> Result<UpstreamAddr, String> {
    if let Ok(addr) = addr_str.parse::<SocketAddr>() {
        return Ok(UpstreamAddr::Resolved(addr));
    }
    if let Ok(ip) = addr_str.parse::<IpAddr>() {
        return Ok(UpstreamAddr::Resolved(SocketAddr::new(ip, DEFAULT_DNS_PORT)));
    }
    let (host, port) =
        parse_host_port(addr_str).ok_or_else(|| format!("Invalid address '{}'", addr_str))?;
    if host.is_empty() || host.contains('/') {
        return Err(format!("Invalid address '{}'", addr_str));
    }
    let port = port.unwrap_or(DEFAULT_DNS_PORT);
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(UpstreamAddr::Resolved(SocketAddr::new(ip, port)));
    }
    Ok(UpstreamAddr::Unresolved {
        hostname: host.into(),
        port,
    })
}

/// Host part of an `https://` URL, without userinfo or port.
pub fn url_hostname(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, rest)| rest)?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = match parse_host_port(authority) {
        Some((host, _)) => host,
        None => authority,
    };
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

impl FromStr for UpstreamSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "default" {
            return Ok(UpstreamSpec::Default);
        }
        if let Some(addr_str) = s.strip_prefix("udp://") {
            let addr = parse_upstream_addr(addr_str)
                .map_err(|_| format!("Invalid UDP address '{}'", addr_str))?;
            return Ok(UpstreamSpec::Udp { addr });
        }
        if let Some(addr_str) = s.strip_prefix("tcp://") {
            let addr = parse_upstream_addr(addr_str)
                .map_err(|_| format!("Invalid TCP address '{}'", addr_str))?;
            return Ok(UpstreamSpec::Tcp { addr });
        }
        if let Some(url) = s.strip_prefix("json+") {
            if !url.starts_with("https://") {
                return Err(format!("Invalid JSON resolver URL '{}'", s));
            }
            let hostname: Arc<str> = url_hostname(url)
                .ok_or_else(|| format!("Invalid HTTPS URL: {}", s))?
                .into();
            return Ok(UpstreamSpec::HttpsJson {
                url: url.into(),
                hostname,
            });
        }
        if s.starts_with("https://") {
            let hostname: Arc<str> = url_hostname(s)
                .ok_or_else(|| format!("Invalid HTTPS URL: {}", s))?
                .into();
            return Ok(UpstreamSpec::Https {
                url: s.into(),
                hostname,
            });
        }
        if s.contains("://") {
            return Err(format!(
                "Unsupported upstream '{}'. Expected 'default', 'HOST[:PORT]', 'udp://', 'tcp://', 'https://' or 'json+https://'",
                s
            ));
        }
        let addr = parse_upstream_addr(s)?;
        Ok(UpstreamSpec::Udp { addr })
    }
}
