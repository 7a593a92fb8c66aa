use clap::Parser;
use ferrous_forwarder_application::ports::ResponseCachePort;
use ferrous_forwarder_domain::CliOverrides;
use ferrous_forwarder_jobs::JobRunner;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "ferrous-forwarder")]
#[command(version)]
#[command(about = "Ferrous Forwarder - caching DNS forwarder with DoH upstreams")]
struct Cli {
    /// Configuration file path (TOML, or JSON when it ends in .json)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address, e.g. 127.0.0.1:53
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        listen: cli.listen.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Ferrous Forwarder v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_file = cli.config.as_deref().unwrap_or("default"),
        listen = %config.listen,
        routes = config.mapping.len(),
        proxy = config.proxy.as_deref().unwrap_or("none"),
        "Configuration loaded"
    );

    let listen_addr = config.listen_addr()?;
    let dns_services = di::DnsServices::new(&config).await?;
    let sockets = server::bind_dns_sockets(listen_addr)?;

    let shutdown = CancellationToken::new();

    let mut runner = JobRunner::new().with_shutdown_token(shutdown.clone());
    if let Some(job) = dns_services.public_ip_job {
        runner = runner.with_public_ip_refresh(job);
    }
    let job_handles = runner.start().await;

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(server::run_dns_server(
        sockets,
        dns_services.handler,
        server_shutdown,
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();

    if let Err(e) = server.await {
        error!(error = %e, "DNS server task failed");
    }
    for handle in job_handles {
        let _ = handle.await;
    }

    let stats = dns_services.cache.stats();
    info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        insertions = stats.insertions,
        expirations = stats.expirations,
        evictions = stats.evictions,
        hit_rate = format!("{:.1}%", stats.hit_rate()),
        "Server shutdown complete"
    );
    Ok(())
}
