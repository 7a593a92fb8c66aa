use ferrous_forwarder_application::ports::{PublicIpLookup, ResponseCachePort};
use ferrous_forwarder_application::services::ClientIp;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_MIN_INTERVAL_SECS: u64 = 60;
const DEFAULT_JITTER_SECS: u64 = 60;

/// Keeps [`ClientIp`] in step with this host's public address.
///
/// A change invalidates every cached response, since upstream answers may
/// have been tailored to the previous client subnet.
pub struct PublicIpRefreshJob {
    lookup: Arc<dyn PublicIpLookup>,
    client_ip: Arc<ClientIp>,
    cache: Arc<dyn ResponseCachePort>,
    min_interval_secs: u64,
    jitter_secs: u64,
    shutdown: CancellationToken,
}

impl PublicIpRefreshJob {
    pub fn new(
        lookup: Arc<dyn PublicIpLookup>,
        client_ip: Arc<ClientIp>,
        cache: Arc<dyn ResponseCachePort>,
    ) -> Self {
        Self {
            lookup,
            client_ip,
            cache,
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            jitter_secs: DEFAULT_JITTER_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, min_secs: u64, jitter_secs: u64) -> Self {
        self.min_interval_secs = min_secs;
        self.jitter_secs = jitter_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    fn next_delay(&self) -> Duration {
        let jitter = if self.jitter_secs == 0 {
            0
        } else {
            fastrand::u64(0..self.jitter_secs)
        };
        Duration::from_secs(self.min_interval_secs + jitter)
    }

    /// Looks the address up once. Returns the new address if it changed.
    pub async fn refresh_once(&self) -> Option<IpAddr> {
        let ip = match self.lookup.lookup().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!(error = %e, "Public IP lookup failed");
                return None;
            }
        };

        let old = self.client_ip.set(ip)?;
        self.cache.purge();
        info!(old = %old, new = %ip, "Public IP changed");
        Some(ip)
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            min_interval_secs = self.min_interval_secs,
            jitter_secs = self.jitter_secs,
            "Starting public IP refresh job"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("PublicIpRefreshJob: shutting down");
                    break;
                }
                _ = self.refresh_once() => {}
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("PublicIpRefreshJob: shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.next_delay()) => {}
            }
        }
    }
}
