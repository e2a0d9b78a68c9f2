//! # mconnect-console
//!
//! Administrative console backend of the MConnect cloud.
//!
//! This binary provides:
//! - **Session handling**: login against the cloud, persisted across restarts
//! - **Authorized drivers**: list and view per site, add/edit/delete
//!   synchronized across every community of the site
//! - **Devices**: per-community device management with a local last-seen cache
//!
//! Every data operation is a pass-through to the cloud API.

mod api;
mod config;
mod error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use mconnect_store::Database;

use crate::api::AppState;
use crate::config::ConsoleConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,mconnect_console=debug,mconnect_sync=debug")
            }),
        )
        .init();

    info!("Starting MConnect console v{}", env!("CARGO_PKG_VERSION"));

    let config = ConsoleConfig::from_env();
    info!(?config, "Loaded configuration");

    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Opened local database");

    let state = AppState::new(&config, db);
    state.restore_session().await?;

    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
