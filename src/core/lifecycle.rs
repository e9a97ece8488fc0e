// src/core/lifecycle.rs

//! The session lifecycle controller: the set of callbacks the transport drives
//! for every connection, wired to the registry and the handler table.

use crate::config::SessionConfig;
use crate::core::EchoError;
use crate::core::handler::{HandlerContext, HandlerTable};
use crate::core::metrics;
use crate::core::protocol::Inbound;
use crate::core::session::{SessionHandle, SessionRegistry};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// The limits the controller enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
    pub wait_timeout: Duration,
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_sessions: config.max_sessions,
            idle_timeout: config.idle_timeout,
            wait_timeout: config.wait_timeout,
        }
    }
}

/// What became of one inbound unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran and succeeded.
    Handled,
    /// A handler ran and failed. `failures` is the session's new failure count,
    /// or `None` if the session left the registry in the meantime.
    Failed { failures: Option<u64> },
    /// No handler is registered for the command; nothing ran.
    UnknownCommand(u32),
    /// The unit could not be decoded; nothing ran.
    Malformed,
}

/// The callbacks a transport invokes over the life of a connection.
///
/// `on_error` and `on_close` are terminal for a handle. All of them may run
/// concurrently for different handles, and `on_cron` may race with any other
/// callback for the same handle.
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// Called once when the connection is established. An error means the
    /// session was not admitted and the transport must drop the connection.
    fn on_open(&self, handle: &SessionHandle) -> Result<(), EchoError>;

    /// Called for every unit the codec produced.
    async fn on_message(&self, handle: &SessionHandle, inbound: Inbound) -> Dispatch;

    /// Called when the connection failed.
    fn on_error(&self, handle: &SessionHandle, err: &EchoError);

    /// Called when the connection is going away for any other reason.
    fn on_close(&self, handle: &SessionHandle);

    /// Called periodically for every tracked session. Returns true if the
    /// session was evicted and asked to close.
    fn on_cron(&self, handle: &SessionHandle) -> bool;
}

/// Owns the session registry and the handler table and implements `SessionListener`.
#[derive(Debug)]
pub struct SessionLifecycle {
    settings: SessionSettings,
    handlers: HandlerTable,
    registry: SessionRegistry,
}

impl SessionLifecycle {
    pub fn new(settings: SessionSettings, handlers: HandlerTable) -> Self {
        Self {
            settings,
            handlers,
            registry: SessionRegistry::new(),
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn discard(&self, reason: &str) {
        metrics::DISCARDED_PACKAGES_TOTAL
            .with_label_values(&[reason])
            .inc();
    }
}

#[async_trait]
impl SessionListener for SessionLifecycle {
    fn on_open(&self, handle: &SessionHandle) -> Result<(), EchoError> {
        if let Err(e) = self
            .registry
            .try_admit(handle.clone(), self.settings.max_sessions)
        {
            metrics::SESSIONS_REJECTED_TOTAL.inc();
            warn!("Session {} rejected: {}", handle, e);
            return Err(e);
        }
        metrics::SESSIONS_ACCEPTED_TOTAL.inc();
        info!("Got session {}", handle);
        Ok(())
    }

    async fn on_message(&self, handle: &SessionHandle, inbound: Inbound) -> Dispatch {
        let package = match inbound {
            Inbound::Package(package) => package,
            Inbound::Malformed { header, reason } => {
                error!(
                    "Session {}: illegal package (cmd {}, seq {}): {}",
                    handle.id, header.command, header.sequence, reason
                );
                self.discard("malformed");
                return Dispatch::Malformed;
            }
        };

        let command = package.command();
        let Some(handler) = self.handlers.resolve(command) else {
            error!("Session {}: {}", handle.id, EchoError::UnknownCommand(command));
            self.discard("unknown_command");
            return Dispatch::UnknownCommand(command);
        };

        metrics::PACKAGES_PROCESSED_TOTAL.inc();
        let ctx = HandlerContext {
            handle,
            wait_timeout: self.settings.wait_timeout,
        };
        match handler.handle(ctx, package).await {
            Ok(()) => Dispatch::Handled,
            Err(e) => {
                metrics::HANDLER_FAILURES_TOTAL.inc();
                let failures = self.registry.record_failure(handle.id);
                match failures {
                    Some(count) => debug!(
                        "Session {}: command {} failed ({} failures so far): {}",
                        handle.id, command, count, e
                    ),
                    None => debug!(
                        "Session {}: command {} failed after the session left the registry: {}",
                        handle.id, command, e
                    ),
                }
                Dispatch::Failed { failures }
            }
        }
    }

    fn on_error(&self, handle: &SessionHandle, err: &EchoError) {
        info!("Session {} got error {}, will be closed.", handle, err);
        if self.registry.remove(handle.id) {
            debug!("Session {} removed from the registry.", handle.id);
        }
    }

    fn on_close(&self, handle: &SessionHandle) {
        info!("Session {} is closing.", handle);
        if self.registry.remove(handle.id) {
            debug!("Session {} removed from the registry.", handle.id);
        }
    }

    fn on_cron(&self, handle: &SessionHandle) -> bool {
        let Some(entry) = self.registry.cron_entry(handle.id) else {
            return false;
        };
        let idle = entry.idle_for(Instant::now());
        if idle <= self.settings.idle_timeout {
            return false;
        }

        // Whoever removes the record owns the close; a concurrent error, close
        // or second sweep finds nothing and backs off.
        let Some(record) = self.registry.take(handle.id) else {
            return false;
        };
        warn!(
            "Session {} timeout: {}, failures {}, admitted {:?} ago",
            handle,
            EchoError::IdleTimeout(idle),
            record.failure_count,
            record.admitted_at.elapsed()
        );
        metrics::IDLE_EVICTIONS_TOTAL.inc();
        record.handle.session.close();
        true
    }
}
