// crates/server/src/main.rs
//! Leveling-sync server binary.
//!
//! Loads the guide and saved progress, optionally attaches to the game log
//! named on the command line, then serves the API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use leveling_sync_core::{Checklist, JsonProgressStore};
use leveling_sync_server::config::Args;
use leveling_sync_server::{create_app_with_static, init_metrics, AppState};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,leveling_sync_server=info,leveling_sync_core=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .compact()
        .init();

    let args = Args::parse();
    init_metrics();

    eprintln!("\n  leveling-sync v{}\n", env!("CARGO_PKG_VERSION"));

    let checklist = Checklist::load(&args.checklist)
        .await
        .with_context(|| format!("loading checklist {}", args.checklist.display()))?;
    let progress_path = args.progress_path()?;
    let progress = tokio::task::spawn_blocking({
        let path = progress_path.clone();
        move || JsonProgressStore::load(path)
    })
    .await?
    .with_context(|| format!("loading progress {}", progress_path.display()))?;

    let state = AppState::new(args.sync_config(), Arc::new(checklist), progress);

    if let Some(log_file) = &args.log_file {
        // A bad path is not fatal: the user can attach from the UI.
        if let Err(e) = state.sync.attach(log_file).await {
            tracing::warn!(path = %log_file.display(), error = %e, "Could not attach to log file");
        }
    }

    let app = create_app_with_static(state.clone(), args.static_dir.clone());

    let port = args.port();
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    eprintln!("  \u{2192} http://localhost:{port}\n");
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sync.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
