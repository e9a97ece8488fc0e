// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::stats::StatsState;
use crate::config::Config;
use crate::core::handler::HandlerTable;
use crate::core::lifecycle::{SessionLifecycle, SessionSettings};
use std::sync::Arc;
use tracing::info;

/// The central struct holding all shared, server-wide state.
/// It is wrapped in an `Arc` and handed to the accept loop, every connection
/// handler and every background task.
#[derive(Debug)]
pub struct ServerState {
    /// The resolved configuration. Read-only after startup.
    pub config: Config,
    /// The session lifecycle controller, owner of the registry and the handler table.
    pub lifecycle: Arc<SessionLifecycle>,
    /// Holds all server-wide statistics.
    pub stats: StatsState,
}

impl ServerState {
    /// Builds the shared state with the standard handler table.
    pub fn initialize(config: Config) -> Arc<Self> {
        Self::with_handlers(config, HandlerTable::standard())
    }

    /// Builds the shared state around an explicit handler table.
    pub fn with_handlers(config: Config, handlers: HandlerTable) -> Arc<Self> {
        info!(
            "Registered command handlers: {:?}",
            handlers.commands()
        );
        let settings = SessionSettings::from(&config.session);
        Arc::new(Self {
            config,
            lifecycle: Arc::new(SessionLifecycle::new(settings, handlers)),
            stats: StatsState::new(),
        })
    }
}
