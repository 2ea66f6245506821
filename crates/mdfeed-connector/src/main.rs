//! mdfeed-connector: Market data gateway binary
//!
//! Opens the configured exchange feeds, publishes canonical events to the
//! event bus and serves the management API.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mdfeed_connector_lib::{
    binance_futures, run_server, start_markets, ConnectorRegistry, EventPublisher,
    ManagementState, WebSocketFeed,
};
use mdfeed_metadata::{Environment, DEFAULT_ORDERBOOK_LENGTH};
use mdfeed_middleware::MiddlewareFactory;

#[derive(Parser, Debug)]
#[command(name = "mdfeed-connector")]
#[command(about = "Exchange market data gateway")]
struct Args {
    /// Path to environment configuration file
    #[arg(short, long, env = "MDFEED_CONFIG")]
    config: PathBuf,

    /// Management server bind address (overrides manage.addr)
    #[arg(long)]
    manage_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let env_config = Environment::load(&args.config)?;
    info!(
        env = %env_config.name,
        markets = env_config.markets.len(),
        "Loaded environment configuration"
    );

    let transport = MiddlewareFactory::create_transport(&env_config).await?;
    let publisher = Arc::new(EventPublisher::new(transport, env_config.subject_prefix()));

    let mut registry = ConnectorRegistry::new(publisher);
    binance_futures::register(&mut registry, WebSocketFeed::builder());
    info!(exchanges = ?registry.exchanges(), "Registered exchange variants");
    let registry = Arc::new(registry);

    let report = start_markets(&registry, &env_config.markets).await;
    if !report.failed.is_empty() {
        warn!(
            started = report.started.len(),
            failed = report.failed.len(),
            "Some markets failed to start"
        );
    }

    let manage_addr: SocketAddr = args
        .manage_addr
        .as_deref()
        .unwrap_or(&env_config.manage.addr)
        .parse()?;
    let start_delay = Duration::from_secs(env_config.manage.start_delay_secs);
    let state = ManagementState::new(Arc::clone(&registry), DEFAULT_ORDERBOOK_LENGTH);

    tokio::spawn(async move {
        tokio::time::sleep(start_delay).await;
        if let Err(e) = run_server(manage_addr, state).await {
            error!(error = %e, addr = %manage_addr, "Management server failed");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    registry.close_all().await;
    info!("Shutdown complete");

    Ok(())
}
