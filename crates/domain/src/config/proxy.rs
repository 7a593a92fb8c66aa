use super::errors::ConfigError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Outbound proxy schemes the HTTPS client can tunnel through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyScheme {
    Socks5,
    /// SOCKS5 with hostname resolution on the proxy side.
    Socks5h,
    Http,
    Https,
    /// Shadowsocks AEAD tunnel (`ss://method:password@host:port`).
    Shadowsocks,
}

impl ProxyScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyScheme::Socks5 => "socks5",
            ProxyScheme::Socks5h => "socks5h",
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Shadowsocks => "ss",
        }
    }
}

impl FromStr for ProxyScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "socks5" => Ok(ProxyScheme::Socks5),
            "socks5h" => Ok(ProxyScheme::Socks5h),
            "http" => Ok(ProxyScheme::Http),
            "https" => Ok(ProxyScheme::Https),
            "ss" => Ok(ProxyScheme::Shadowsocks),
            other => Err(ConfigError::UnsupportedProxyScheme(other.to_string())),
        }
    }
}

/// Shadowsocks AEAD methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowsocksMethod {
    Aes128Gcm,
    Aes256Gcm,
    Chacha20IetfPoly1305,
}

impl ShadowsocksMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShadowsocksMethod::Aes128Gcm => "aes-128-gcm",
            ShadowsocksMethod::Aes256Gcm => "aes-256-gcm",
            ShadowsocksMethod::Chacha20IetfPoly1305 => "chacha20-ietf-poly1305",
        }
    }

    /// Key length in bytes; the per-session salt has the same length.
    pub fn key_len(&self) -> usize {
        match self {
            ShadowsocksMethod::Aes128Gcm => 16,
            ShadowsocksMethod::Aes256Gcm | ShadowsocksMethod::Chacha20IetfPoly1305 => 32,
        }
    }
}

impl FromStr for ShadowsocksMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes-128-gcm" => Ok(ShadowsocksMethod::Aes128Gcm),
            "aes-256-gcm" => Ok(ShadowsocksMethod::Aes256Gcm),
            "chacha20-ietf-poly1305" | "chacha20-poly1305" => {
                Ok(ShadowsocksMethod::Chacha20IetfPoly1305)
            }
            other => Err(ConfigError::Validation(format!(
                "unsupported shadowsocks method '{}'",
                other
            ))),
        }
    }
}

/// Method and password of an `ss://` proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ShadowsocksCredentials {
    pub method: ShadowsocksMethod,
    pub password: String,
}

impl fmt::Debug for ShadowsocksCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowsocksCredentials")
            .field("method", &self.method)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A validated `proxy` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub scheme: ProxyScheme,
    pub url: String,
    pub host: String,
    pub port: Option<u16>,
    /// Present exactly when `scheme` is [`ProxyScheme::Shadowsocks`].
    pub shadowsocks: Option<ShadowsocksCredentials>,
}

impl ProxyEndpoint {
    /// The proxy host when it is a name rather than a literal IP.
    ///
    /// Such a name must never be resolved through an upstream that itself
    /// goes through the proxy.
    pub fn loop_domain(&self) -> Option<&str> {
        if self.host.parse::<IpAddr>().is_ok() {
            None
        } else {
            Some(self.host.trim_end_matches('.'))
        }
    }
}

impl FromStr for ProxyEndpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scheme_str, rest) = s
            .split_once("://")
            .ok_or_else(|| ConfigError::Validation(format!("invalid proxy url '{}'", s)))?;
        let scheme: ProxyScheme = scheme_str.parse()?;

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let (userinfo, authority) = match authority.rsplit_once('@') {
            Some((userinfo, host)) => (Some(userinfo), host),
            None => (None, authority),
        };

        let (host, port_str) = if let Some(bracketed) = authority.strip_prefix('[') {
            let end = bracketed
                .find(']')
                .ok_or_else(|| ConfigError::Validation(format!("invalid proxy url '{}'", s)))?;
            let tail = &bracketed[end + 1..];
            (&bracketed[..end], tail.strip_prefix(':'))
        } else {
            match authority.rsplit_once(':') {
                Some((h, p)) => (h, Some(p)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(ConfigError::Validation(format!(
                "proxy url '{}' has no host",
                s
            )));
        }
        let port = port_str
            .map(|p| {
                p.parse::<u16>().map_err(|_| {
                    ConfigError::Validation(format!("invalid proxy port in '{}'", s))
                })
            })
            .transpose()?;

        let shadowsocks = match scheme {
            ProxyScheme::Shadowsocks => {
                if port.is_none() {
                    return Err(ConfigError::Validation(format!(
                        "shadowsocks proxy '{}' needs a port",
                        s
                    )));
                }
                Some(shadowsocks_credentials(userinfo)?)
            }
            _ => None,
        };

        Ok(Self {
            scheme,
            url: s.to_string(),
            host: host.to_string(),
            port,
            shadowsocks,
        })
    }
}

fn shadowsocks_credentials(userinfo: Option<&str>) -> Result<ShadowsocksCredentials, ConfigError> {
    let (method, password) = userinfo
        .and_then(|info| info.split_once(':'))
        .ok_or_else(|| {
            ConfigError::Validation("shadowsocks proxy needs 'method:password@'".to_string())
        })?;
    if password.is_empty() {
        return Err(ConfigError::Validation(
            "shadowsocks proxy has an empty password".to_string(),
        ));
    }

    Ok(ShadowsocksCredentials {
        method: method.parse()?,
        password: password.to_string(),
    })
}
