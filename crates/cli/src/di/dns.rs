use anyhow::Context;
use ferrous_forwarder_application::ports::ResponseCachePort;
use ferrous_forwarder_application::services::{ClientIp, SubnetAnnotator, SubnetSource};
use ferrous_forwarder_application::use_cases::DispatchQueryUseCase;
use ferrous_forwarder_domain::Config;
use ferrous_forwarder_infrastructure::dns::transport::DirectDialer;
use ferrous_forwarder_infrastructure::dns::{build_router, DnsServerHandler, ResponseCache};
use ferrous_forwarder_infrastructure::public_ip::HttpPublicIpLookup;
use ferrous_forwarder_jobs::PublicIpRefreshJob;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::info;

pub struct DnsServices {
    pub handler: Arc<DnsServerHandler>,
    pub cache: Arc<ResponseCache>,
    /// Present only when the public address is discovered dynamically.
    pub public_ip_job: Option<PublicIpRefreshJob>,
}

impl DnsServices {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        info!("Initializing DNS services");

        let cache = Arc::new(ResponseCache::new(
            config.cache_size,
            config.negative_ttl_cap_sec,
        ));
        let router = Arc::new(
            build_router(config, Arc::new(DirectDialer))
                .await
                .context("failed to build upstream routes")?,
        );

        let static_ip = config.static_ip()?;
        let client_ip = Arc::new(ClientIp::new(
            static_ip.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        ));

        let subnet_source = match config.client_subnet()? {
            Some(prefix) => {
                info!(subnet = %prefix, "Using fixed EDNS client subnet");
                SubnetSource::Fixed(prefix)
            }
            None => SubnetSource::Detected(Arc::clone(&client_ip)),
        };

        let public_ip_job = match static_ip {
            Some(ip) => {
                info!(ip = %ip, "Using static public IP, discovery disabled");
                None
            }
            None => {
                let lookup = HttpPublicIpLookup::new(config.myip_url.clone())
                    .context("failed to build public IP lookup client")?;
                let cache_port: Arc<dyn ResponseCachePort> = cache.clone();
                Some(PublicIpRefreshJob::new(
                    Arc::new(lookup),
                    Arc::clone(&client_ip),
                    cache_port,
                ))
            }
        };

        let use_case = Arc::new(DispatchQueryUseCase::new(
            cache.clone(),
            router,
            Arc::new(SubnetAnnotator::new(subnet_source)),
            config.query_timeout(),
        ));

        info!(
            cache_size = cache.capacity(),
            query_timeout_ms = config.query_timeout().as_millis() as u64,
            "DNS services ready"
        );

        Ok(Self {
            handler: Arc::new(DnsServerHandler::new(use_case)),
            cache,
            public_ip_job,
        })
    }
}
