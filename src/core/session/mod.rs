// src/core/session/mod.rs

//! The transport-facing view of a connection and the registry of live sessions.

mod record;
mod registry;

pub use record::SessionRecord;
pub use registry::{CronEntry, SessionRegistry};

use crate::core::EchoError;
use crate::core::protocol::EchoPackage;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Synthetic identifier assigned by the accept loop to every accepted connection.
/// Identifiers are never reused within one process.
pub type SessionId = u64;

/// What the core needs from a transport connection.
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// Queues `package` for delivery, waiting at most `timeout` for room.
    async fn write_with_timeout(
        &self,
        package: EchoPackage,
        timeout: Duration,
    ) -> Result<(), EchoError>;

    /// Asks the transport to tear the connection down. Safe to call more than once.
    fn close(&self);

    /// The last time the transport observed traffic on this connection.
    fn last_active(&self) -> Instant;

    /// A short description for log lines.
    fn describe(&self) -> String;
}

/// A session identifier paired with its transport connection.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub session: Arc<dyn Session>,
}

impl SessionHandle {
    pub fn new(id: SessionId, session: Arc<dyn Session>) -> Self {
        Self { id, session }
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.session.describe())
    }
}
