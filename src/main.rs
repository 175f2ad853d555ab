//! Media API Gateway
//!
//! Re-exposes a media-lookup service under a stable public API.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                  GATEWAY                      │
//!   Client Request       │  ┌──────────┐   ┌────────────┐   ┌─────────┐  │
//!   ─────────────────────┼─▶│  CORS /  │──▶│  routing   │──▶│ request │  │
//!                        │  │ req. ID  │   │ classifier │   │translate│  │
//!                        │  └──────────┘   └────────────┘   └────┬────┘  │
//!                        │                                       │       │
//!                        │         short pool ◀──────────────────┤       │
//!                        │   (health/search/song, 30s ceiling)   │       │
//!                        │                                       │       │
//!                        │     streaming pool ◀──────────────────┘       │
//!                        │   (stream, connect deadline only)             │
//!                        │                                               │
//!   Client Response      │  ┌──────────────────────────────┐             │
//!   ◀────────────────────┼──│ relay: buffered | streaming  │◀────────────┼── Upstream
//!                        │  └──────────────────────────────┘             │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use media_gateway::config::{load_config, Overrides};
use media_gateway::observability::{logging, metrics};
use media_gateway::{ClientPools, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "media-gateway")]
#[command(about = "HTTP gateway in front of the media-lookup service", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream base URL, e.g. http://localhost:5000.
    #[arg(long, env = "UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = Overrides {
        upstream_url: cli.upstream_url,
        port: cli.port,
    };
    let config = load_config(cli.config.as_deref(), &overrides)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "media-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        default_limit = config.search.default_limit,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let pools = Arc::new(ClientPools::from_config(&config.pools)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config, pools);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
