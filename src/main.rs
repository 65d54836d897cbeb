//! Tailnet HTTP gateway (provider process)
//!
//! Exposes actors as HTTP services on an overlay network.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                 TAILNET GATEWAY                  │
//!                      │                                                  │
//!   Host ──────────────┼─▶ admin API ──▶ LinkManager ──▶ overlay join      │
//!   (link add/remove)  │                     │                            │
//!                      │                     ▼                            │
//!   Client Request     │  ┌──────────┐   ┌─────────┐   ┌──────────┐       │
//!   ───────────────────┼─▶│ listener │──▶│  http   │──▶│ envelope │───────┼──▶ Actor
//!                      │  │ mode/tls │   │identity │   │ dispatch │       │
//!                      │  └──────────┘   └─────────┘   └──────────┘       │
//!   Client Response    │                      ▲              │            │
//!   ◀──────────────────┼──────────────────────┴──────────────┘            │
//!                      └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use tailnet_gateway::admin::{setup_admin_router, AdminState};
use tailnet_gateway::config::loader::load_or_default;
use tailnet_gateway::dispatch::HttpDispatcher;
use tailnet_gateway::lifecycle::{signals, LinkManager, LinkSettings, Shutdown};
use tailnet_gateway::observability::{logging, metrics};
use tailnet_gateway::overlay::LoopbackOverlay;

#[derive(Parser)]
#[command(name = "tailnet-gateway")]
#[command(about = "HTTP gateway exposing actors on an overlay network", long_about = None)]
struct Args {
    /// Path to the TOML settings file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("tailnet-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        max_in_flight = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        dispatch_endpoint = %config.dispatch.endpoint,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let overlay = Arc::new(LoopbackOverlay::from_config(&config.overlay)?);
    let dispatcher = Arc::new(HttpDispatcher::new(&config.dispatch));
    let links = Arc::new(LinkManager::new(
        overlay,
        dispatcher,
        LinkSettings::from_config(&config),
    ));

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let router = setup_admin_router(AdminState {
            links: links.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        });
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;
    } else {
        tracing::warn!("Admin API disabled; no links can be added");
        shutdown.wait().await;
    }

    links.shutdown_all().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
