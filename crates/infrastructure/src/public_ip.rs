use async_trait::async_trait;
use ferrous_forwarder_application::ports::PublicIpLookup;
use ferrous_forwarder_domain::DomainError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LookupData {
    ip: String,
}

/// `{"code": 0, "data": {"ip": "..."}}`; only `data.ip` is consulted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LookupBody {
    data: LookupData,
}

/// Finds this host's public address through an HTTP lookup service.
///
/// Always connects directly, never through the configured proxy.
pub struct HttpPublicIpLookup {
    url: String,
    client: reqwest::Client,
}

impl HttpPublicIpLookup {
    pub fn new(url: impl Into<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                DomainError::ConfigError(format!("failed to build lookup client: {}", e))
            })?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    fn failed(&self, reason: impl ToString) -> DomainError {
        DomainError::TransportReadFailed {
            server: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Extracts the address from a lookup response body.
pub fn parse_lookup_body(body: &[u8]) -> Result<IpAddr, String> {
    let parsed: LookupBody = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let ip = parsed.data.ip.trim();
    if ip.is_empty() {
        return Err(format!("unexpected result: {}", String::from_utf8_lossy(body)));
    }
    ip.parse().map_err(|_| format!("unexpected ip: {}", ip))
}

#[async_trait]
impl PublicIpLookup for HttpPublicIpLookup {
    async fn lookup(&self) -> Result<IpAddr, DomainError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.failed(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DomainError::TransportHttpStatus {
                server: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.failed(e))?;
        let ip = parse_lookup_body(&body).map_err(|reason| self.failed(reason))?;
        debug!(url = %self.url, ip = %ip, "Public IP lookup succeeded");
        Ok(ip)
    }
}
