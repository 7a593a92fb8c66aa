use super::transport::http_client::{build_https_client, DOH_REQUEST_TIMEOUT};
use super::transport::{ClassicUpstream, Dialer, HttpsJsonUpstream, HttpsUpstream};
use ferrous_forwarder_application::ports::Upstream;
use ferrous_forwarder_application::services::DomainRouter;
use ferrous_forwarder_domain::upstream_spec::DEFAULT_DOH_JSON_URL;
use ferrous_forwarder_domain::{Config, ConfigError, DomainError, UpstreamSpec};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Builds upstreams from their specs. Equal specs share one instance.
pub struct UpstreamFactory {
    dialer: Arc<dyn Dialer>,
    https_client: reqwest::Client,
    timeout: Duration,
    built: FxHashMap<UpstreamSpec, Arc<dyn Upstream>>,
}

impl UpstreamFactory {
    pub fn new(dialer: Arc<dyn Dialer>, https_client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            dialer,
            https_client,
            timeout,
            built: FxHashMap::default(),
        }
    }

    pub fn build(&mut self, spec: &UpstreamSpec) -> Arc<dyn Upstream> {
        if let Some(existing) = self.built.get(spec) {
            return Arc::clone(existing);
        }

        let upstream: Arc<dyn Upstream> = match spec {
            UpstreamSpec::Default => Arc::new(HttpsJsonUpstream::new(
                Arc::from(DEFAULT_DOH_JSON_URL),
                self.https_client.clone(),
            )),
            UpstreamSpec::HttpsJson { url, .. } => Arc::new(HttpsJsonUpstream::new(
                Arc::clone(url),
                self.https_client.clone(),
            )),
            UpstreamSpec::Https { url, .. } => Arc::new(HttpsUpstream::new(
                Arc::clone(url),
                self.https_client.clone(),
            )),
            UpstreamSpec::Udp { addr } => Arc::new(ClassicUpstream::udp(
                addr.clone(),
                Arc::clone(&self.dialer),
                self.timeout,
            )),
            UpstreamSpec::Tcp { addr } => Arc::new(ClassicUpstream::tcp(
                addr.clone(),
                Arc::clone(&self.dialer),
                self.timeout,
            )),
        };

        debug!(
            protocol = spec.protocol_name(),
            upstream = upstream.name(),
            "Upstream created"
        );
        self.built.insert(spec.clone(), Arc::clone(&upstream));
        upstream
    }
}

/// Route table, loop domains and fallback assembled from `config`.
pub async fn build_router(
    config: &Config,
    dialer: Arc<dyn Dialer>,
) -> Result<DomainRouter, DomainError> {
    let config_error = |e: ConfigError| DomainError::ConfigError(e.to_string());

    let proxy = config.proxy_endpoint().map_err(config_error)?;
    let https_client = build_https_client(proxy.as_ref(), DOH_REQUEST_TIMEOUT).await?;
    let mut factory = UpstreamFactory::new(dialer, https_client, config.query_timeout());

    let mut routes = Vec::new();
    for (suffix, specs) in config.routes().map_err(config_error)? {
        let upstreams: Vec<Arc<dyn Upstream>> =
            specs.iter().map(|spec| factory.build(spec)).collect();
        info!(
            suffix = %suffix,
            upstreams = ?upstreams.iter().map(|u| u.name()).collect::<Vec<_>>(),
            "Route configured"
        );
        routes.push((suffix, upstreams));
    }

    let fallback = factory.build(&config.fallback().map_err(config_error)?);
    let loop_domains = config.loop_domains().map_err(config_error)?;
    info!(fallback = fallback.name(), loop_domains = ?loop_domains, "Router ready");

    Ok(DomainRouter::new(routes, loop_domains, fallback))
}
