use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use common::{Clock, MemorySessionStore, SystemClock};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod archive;
mod config;
mod cookies;
mod error;
mod middleware;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod upstream;
mod validation;

use tokio::net::TcpListener;

use crate::{
    archive::ScheduleArchive, config::GatewayConfig, state::AppState, upstream::UpstreamClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting iclass gateway");

    let config = GatewayConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let ttl = Duration::try_seconds(config.session_ttl_secs)
        .context("session TTL out of range")?;
    let sessions = MemorySessionStore::with_ttl(clock.clone(), ttl);
    let upstream = UpstreamClient::new(&config, clock.clone())?;

    let archive = ScheduleArchive::new(config.data_dir.clone());
    info!("Archiving schedules under {}", archive.dir().display());

    let app_state = AppState {
        sessions: Arc::new(sessions),
        upstream,
        archive,
        clock,
        session_ttl_secs: config.session_ttl_secs,
        cookie_secure: config.cookie_secure,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
