// src/server/initialization.rs

//! Builds the shared state and binds the listener before the main loop starts.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::state::ServerState;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Echo server listening on {}", listener.local_addr()?);

    let server_state = ServerState::initialize(config);
    info!("Server state initialized.");

    Ok(ServerContext {
        state: server_state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    let session = &config.session;
    info!(
        "Session limits: max {} sessions, idle timeout {:?}, wait timeout {:?}, cron every {:?}.",
        session.max_sessions, session.idle_timeout, session.wait_timeout, session.cron_period
    );
    info!(
        "Packages limited to {} body bytes; {} queued replies per session.",
        session.max_message_len, session.outbound_queue_size
    );
    if !session.tcp_no_delay {
        warn!("TCP_NODELAY is disabled; small replies may be delayed by Nagle's algorithm.");
    }
}
