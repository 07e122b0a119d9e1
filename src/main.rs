//! League gateway (v1)
//!
//! HTTP ingress for the league site's backend-as-a-service.
//!
//! # Architecture Overview
//!
//! ```text
//! client
//!   → security headers → CORS → request ID / trace → gzip → body limit
//!   → request logger (security events) → general limiter
//!   → auth | admin limiter → validation extractor → handler
//!   → Supabase auth / REST / functions
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use league_gateway::config::load_config;
use league_gateway::lifecycle::Shutdown;
use league_gateway::observability::{logging, metrics};
use league_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "league-gateway")]
#[command(about = "Security ingress for the league site backend", long_about = None)]
struct Args {
    /// Optional TOML config file (also read from GATEWAY_CONFIG).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var_os("GATEWAY_CONFIG").map(PathBuf::from));

    let config = load_config(config_path.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("league-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address(),
        environment = %config.server.environment,
        cors_origins = ?config.cors.origins,
        upstream = %config.upstream.supabase_url,
        "Configuration loaded"
    );
    if config.upstream.supabase_anon_key.is_empty() {
        tracing::warn!("SUPABASE_ANON_KEY is not set; upstream calls will be unauthenticated");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let _signals = shutdown.trigger_on_signal();

    let server = GatewayServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
