use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::proxy::ProxyEndpoint;
use crate::question::strip_trailing_dots;
use crate::subnet::SubnetPrefix;
use crate::upstream_spec::{UpstreamSpec, DEFAULT_DOH_JSON_HOST};

pub const DEFAULT_CACHE_SIZE: usize = 1000;
pub const DEFAULT_QUERY_TIMEOUT_SEC: u64 = 5;

/// Main configuration structure for the forwarder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Address the UDP and TCP listeners bind to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Outbound proxy for HTTPS upstreams (`socks5://`, `socks5h://`, `http://`, `https://`, `ss://`)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Static public IP; disables discovery when set
    #[serde(default)]
    pub myip: Option<String>,

    /// Domain suffix to comma-separated upstream list. `""` is the default route.
    #[serde(default = "default_mapping")]
    pub mapping: BTreeMap<String, String>,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Per-attempt upstream timeout
    #[serde(default = "default_query_timeout_sec")]
    pub query_timeout_sec: u64,

    /// Operator-chosen client subnet (`addr/prefix`) sent instead of the detected IP
    #[serde(default)]
    pub edns_client_subnet: Option<String>,

    /// Classic resolver used when loop avoidance leaves no candidate
    #[serde(default = "default_fallback_upstream")]
    pub fallback_upstream: String,

    /// Public-IP lookup endpoint
    #[serde(default = "default_myip_url")]
    pub myip_url: String,

    /// Upper bound for SOA-derived negative cache TTLs
    #[serde(default = "default_negative_ttl_cap_sec")]
    pub negative_ttl_cap_sec: u32,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            proxy: None,
            myip: None,
            mapping: default_mapping(),
            cache_size: default_cache_size(),
            query_timeout_sec: default_query_timeout_sec(),
            edns_client_subnet: None,
            fallback_upstream: default_fallback_upstream(),
            myip_url: default_myip_url(),
            negative_ttl_cap_sec: default_negative_ttl_cap_sec(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-forwarder.toml in current directory
    /// 3. /etc/ferrous-forwarder/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new("ferrous-forwarder.toml").exists() {
            Self::from_file("ferrous-forwarder.toml")?
        } else if Path::new("/etc/ferrous-forwarder/config.toml").exists() {
            Self::from_file("/etc/ferrous-forwarder/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.normalize();
        Ok(config)
    }

    /// Files ending in `.json` are read as JSON, everything else as TOML.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        let is_json = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(listen) = overrides.listen {
            self.listen = listen;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Zero sizes and empty strings fall back to their defaults.
    pub fn normalize(&mut self) {
        if self.listen.trim().is_empty() {
            self.listen = default_listen();
        }
        if self.cache_size == 0 {
            self.cache_size = DEFAULT_CACHE_SIZE;
        }
        if self.query_timeout_sec == 0 {
            self.query_timeout_sec = DEFAULT_QUERY_TIMEOUT_SEC;
        }
        for field in [&mut self.proxy, &mut self.myip, &mut self.edns_client_subnet] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        self.routes()?;
        self.fallback()?;
        self.proxy_endpoint()?;
        self.static_ip()?;
        self.client_subnet()?;
        if self.myip.is_none() && !self.myip_url.starts_with("http") {
            return Err(ConfigError::Validation(format!(
                "myip_url '{}' is not an HTTP URL",
                self.myip_url
            )));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| {
            ConfigError::Validation(format!("invalid listen address '{}'", self.listen))
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_sec)
    }

    /// Parsed routing table. Keys lose their trailing dots and a missing
    /// default route becomes the built-in DoH upstream.
    pub fn routes(&self) -> Result<BTreeMap<String, Vec<UpstreamSpec>>, ConfigError> {
        let mut routes = BTreeMap::new();
        for (suffix, value) in &self.mapping {
            let specs = UpstreamSpec::parse_list(value).map_err(|e| {
                ConfigError::Validation(format!("mapping '{}': {}", suffix, e))
            })?;
            if specs.is_empty() {
                continue;
            }
            routes.insert(strip_trailing_dots(suffix).to_ascii_lowercase(), specs);
        }
        routes
            .entry(String::new())
            .or_insert_with(|| vec![UpstreamSpec::Default]);
        Ok(routes)
    }

    pub fn fallback(&self) -> Result<UpstreamSpec, ConfigError> {
        let spec: UpstreamSpec = self.fallback_upstream.parse().map_err(|e| {
            ConfigError::Validation(format!("fallback_upstream: {}", e))
        })?;
        if spec.uses_https() {
            return Err(ConfigError::Validation(format!(
                "fallback_upstream '{}' must be a classic resolver",
                self.fallback_upstream
            )));
        }
        Ok(spec)
    }

    pub fn proxy_endpoint(&self) -> Result<Option<ProxyEndpoint>, ConfigError> {
        self.proxy.as_deref().map(str::parse).transpose()
    }

    pub fn static_ip(&self) -> Result<Option<IpAddr>, ConfigError> {
        self.myip
            .as_deref()
            .map(|ip| {
                ip.trim()
                    .parse()
                    .map_err(|_| ConfigError::Validation(format!("invalid myip '{}'", ip)))
            })
            .transpose()
    }

    pub fn client_subnet(&self) -> Result<Option<SubnetPrefix>, ConfigError> {
        self.edns_client_subnet
            .as_deref()
            .map(|s| {
                s.parse()
                    .map_err(|e| ConfigError::Validation(format!("edns_client_subnet: {}", e)))
            })
            .transpose()
    }

    /// Names whose resolution must bypass HTTPS upstreams.
    pub fn loop_domains(&self) -> Result<Vec<String>, ConfigError> {
        let mut domains = vec![DEFAULT_DOH_JSON_HOST.to_string()];
        if let Some(proxy) = self.proxy_endpoint()? {
            if let Some(host) = proxy.loop_domain() {
                let host = host.to_ascii_lowercase();
                if !domains.contains(&host) {
                    domains.push(host);
                }
            }
        }
        Ok(domains)
    }
}

fn default_listen() -> String {
    "127.0.0.1:53".to_string()
}

fn default_mapping() -> BTreeMap<String, String> {
    BTreeMap::from([(String::new(), "default".to_string())])
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_query_timeout_sec() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SEC
}

fn default_fallback_upstream() -> String {
    "223.5.5.5:53".to_string()
}

fn default_myip_url() -> String {
    "http://ip.taobao.com/service/getIpInfo.php?ip=myip".to_string()
}

fn default_negative_ttl_cap_sec() -> u32 {
    300
}
