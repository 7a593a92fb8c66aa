use super::shadowsocks::{ShadowsocksBridge, ShadowsocksTunnel};
use ferrous_forwarder_domain::{DomainError, ProxyEndpoint};
use std::time::Duration;
use tracing::info;

/// Overall per-request timeout of the shared DoH client.
pub const DOH_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

const POOL_MAX_IDLE_PER_HOST: usize = 4;

/// Builds the client every HTTPS upstream shares, tunnelled through `proxy`
/// when one is configured. An `ss://` proxy starts a local bridge first.
pub async fn build_https_client(
    proxy: Option<&ProxyEndpoint>,
    timeout: Duration,
) -> Result<reqwest::Client, DomainError> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST);

    match proxy {
        Some(endpoint) => {
            let proxy_url = proxy_url(endpoint).await?;
            let proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| {
                DomainError::ConfigError(format!("invalid proxy '{}': {}", endpoint.url, e))
            })?;
            builder = builder.proxy(proxy);
            info!(
                scheme = endpoint.scheme.as_str(),
                host = %endpoint.host,
                "HTTPS upstreams go through proxy"
            );
        }
        None => builder = builder.no_proxy(),
    }

    builder
        .build()
        .map_err(|e| DomainError::ConfigError(format!("failed to build HTTPS client: {}", e)))
}

async fn proxy_url(endpoint: &ProxyEndpoint) -> Result<String, DomainError> {
    let (Some(credentials), Some(port)) = (&endpoint.shadowsocks, endpoint.port) else {
        return Ok(endpoint.url.clone());
    };

    let tunnel = ShadowsocksTunnel::new(&endpoint.host, port, credentials);
    let bridge = ShadowsocksBridge::start(tunnel).await.map_err(|e| {
        DomainError::ConfigError(format!("failed to start shadowsocks bridge: {}", e))
    })?;
    Ok(bridge.socks_url())
}
