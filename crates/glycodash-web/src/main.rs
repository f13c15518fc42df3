//! Glycodash web server
//!
//! Run with: cargo run -p glycodash-web

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use glycodash_config::Config;
use glycodash_web::{router::build_router, session::spawn_idle_sweeper, state::AppState};

const DEFAULT_FILTER: &str = "info,glycodash_auth=info,glycodash_data=info,glycodash_context=info";
const DEBUG_FILTER: &str =
    "info,glycodash_auth=debug,glycodash_data=debug,glycodash_context=debug,glycodash_web=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.debug { DEBUG_FILTER } else { DEFAULT_FILTER })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        require_login = config.require_login,
        offline_mode = config.offline_mode,
        bind = %config.server.bind,
        "Starting Glycodash"
    );

    let config = Arc::new(config);
    let state = AppState::from_config(Arc::clone(&config))?;

    // Load the shared reference data in the background; sessions that ask
    // before it finishes join the same load.
    let reference = Arc::clone(&state.reference);
    tokio::spawn(async move {
        match reference.warm().await {
            Ok(()) => info!("Reference data loaded"),
            Err(e) => warn!(error = %e, "Reference data preload failed, will retry on demand"),
        }
    });

    let state = Arc::new(state);
    spawn_idle_sweeper(Arc::clone(&state));
    info!(
        idle_secs = config.server.session_idle_secs,
        sweep_secs = config.server.session_sweep_secs,
        "Idle session sweep started"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!("Server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
