//! # Stitch Market Web Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stitch.toml + STITCH__* ──► WebConfig                                 │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  SQLite (WAL, migrations) ──► AppState ──► axum::serve (port 8080)     │
//! │                                                  │                      │
//! │                                    Ctrl+C / SIGTERM: drain, close pool  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;

use anyhow::Context;
use stitch_db::{Database, DbConfig};
use stitch_web::{app, AppState, WebConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stitch_web=info,stitch_db=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Stitch Market web server...");

    let config = WebConfig::load().context("loading configuration")?;
    info!(
        db_path = %config.database.path,
        currency = %config.billing.currency,
        locale = %config.locale.default,
        "Configuration loaded"
    );

    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await
    .context("opening database")?;

    let addr = config.bind_addr()?;
    let state = AppState::new(db.clone(), config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(%err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
