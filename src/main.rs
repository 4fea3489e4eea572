//! Driver-incentive dashboard API proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser                ┌──────────────────────────────────────────────┐
//!     ──────────────────────▶│ server: request id → trace → dispatch        │
//!                            │   ├─ /api/whoami        → diagnostics         │
//!                            │   ├─ outside prefix     → 404 JSON            │
//!                            │   ├─ OPTIONS            → 204 preflight       │
//!                            │   └─ otherwise:                               │
//!                            │        locator (BACKEND_URL / fallback)       │
//!                            │        translator (/api/proxy/x → /api/x)     │
//!                            │        header filter (drop host, join dups)   │      Incentive
//!                            │        forwarder (stream, no redirects) ──────┼────▶ backend
//!     ◀──────────────────────│        header filter (drop length, + CORS) ◀──┼─────
//!                            └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use incentive_proxy::config::watcher::ConfigWatcher;
use incentive_proxy::config::{load_or_default, ProxyConfig};
use incentive_proxy::observability::{logging, metrics};
use incentive_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "incentive-proxy")]
#[command(about = "Forwards dashboard API calls to the driver-incentive backend", long_about = None)]
struct Cli {
    /// TOML configuration file; watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config: ProxyConfig = load_or_default(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("incentive-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    match config.backend.url.as_deref() {
        Some(url) => tracing::info!(backend = %url, "Backend configured"),
        None if config.backend.use_fallback => tracing::warn!(
            fallback = %config.backend.fallback_url,
            "BACKEND_URL not set, using fallback backend"
        ),
        None => tracing::warn!("BACKEND_URL not set and fallback disabled, proxied requests will fail with 500"),
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        public_prefix = %config.routing.public_prefix,
        upstream_prefix = %config.routing.upstream_prefix,
        relay_mode = ?config.relay.mode,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match cli.config.as_deref() {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
