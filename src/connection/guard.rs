// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for session cleanup.

use crate::core::lifecycle::SessionListener;
use crate::core::metrics;
use crate::core::session::SessionHandle;
use std::sync::Arc;
use tracing::debug;

/// Makes sure an admitted session always leaves the registry, even if the
/// connection task unwinds before it could deliver `on_error` or `on_close`.
pub struct ConnectionGuard {
    listener: Arc<dyn SessionListener>,
    handle: SessionHandle,
    /// Set once a terminal callback has been delivered.
    released: bool,
}

impl ConnectionGuard {
    /// Creates a guard for a session that has just been admitted.
    pub(crate) fn new(listener: Arc<dyn SessionListener>, handle: SessionHandle) -> Self {
        metrics::CONNECTED_SESSIONS.inc();
        Self {
            listener,
            handle,
            released: false,
        }
    }

    /// Marks the terminal callback as delivered, skipping cleanup in `Drop`.
    pub(crate) fn release(&mut self) {
        self.released = true;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::CONNECTED_SESSIONS.dec();
        if self.released {
            return;
        }
        debug!(
            "ConnectionGuard dropping without a terminal callback, cleaning up session {}",
            self.handle.id
        );
        self.listener.on_close(&self.handle);
    }
}
