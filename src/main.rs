//! Clinic billing HTTP server.
//!
//! # Environment Variables
//! - `CLINIC_CONFIG_DIR`: configuration directory (default: "./config/clinic")
//! - `CLINIC_BIND_ADDR`: listen address (default: "0.0.0.0:3000")
//! - `RUST_LOG`: log filter (default directive: "clinic_billing=info")

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_billing::api::{AppState, create_router};
use clinic_billing::config::ConfigLoader;
use clinic_billing::store::{ClinicRepository, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_billing=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_dir =
        std::env::var("CLINIC_CONFIG_DIR").unwrap_or_else(|_| "./config/clinic".into());
    let bind_addr: SocketAddr = std::env::var("CLINIC_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()
        .context("CLINIC_BIND_ADDR is not a valid socket address")?;

    let config = ConfigLoader::load(&config_dir)
        .with_context(|| format!("failed to load configuration from {config_dir}"))?;
    info!(
        clinic = %config.clinic().name,
        currency = %config.clinic().currency,
        default_admin_fee = %config.default_admin_fee(),
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let store = Arc::new(MemoryStore::new());

    let seeds = config.sitting_fee_seeds();
    if !seeds.is_empty() {
        let repo = ClinicRepository::new(store.clone(), config.retry_policy(), shutdown.clone());
        for record in seeds {
            repo.put_sitting_fee(record).await?;
        }
        info!(count = seeds.len(), "Seeded sitting fees");
    }

    let state = AppState::new(config, store, shutdown.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Clinic billing server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels in-flight store retries.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    shutdown.cancel();
}
