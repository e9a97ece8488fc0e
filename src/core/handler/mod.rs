// src/core/handler/mod.rs

//! Command handlers and the table that routes a package to one of them.

pub mod echo;
pub mod heartbeat;

pub use echo::EchoHandler;
pub use heartbeat::HeartbeatHandler;

use crate::core::EchoError;
use crate::core::protocol::{ECHO_CMD, EchoPackage, HEARTBEAT_CMD};
use crate::core::session::SessionHandle;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Everything a handler gets to see about the session it is serving.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub handle: &'a SessionHandle,
    /// Upper bound for any reply written during this invocation.
    pub wait_timeout: Duration,
}

impl HandlerContext<'_> {
    /// Writes `package` back to the session within the configured wait timeout.
    pub async fn reply(&self, package: EchoPackage) -> Result<(), EchoError> {
        self.handle
            .session
            .write_with_timeout(package, self.wait_timeout)
            .await
    }
}

/// Processes one decoded package for one session.
///
/// Implementations are stateless with respect to sessions and never retry a
/// failed reply; the error goes back to the caller.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: HandlerContext<'_>, package: EchoPackage)
    -> Result<(), EchoError>;
}

/// An immutable mapping from command identifier to handler, built once at startup.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<u32, Arc<dyn CommandHandler>>,
}

impl HandlerTable {
    /// Builds a table from `(command, handler)` pairs. A command listed twice is rejected.
    pub fn new<I>(pairs: I) -> Result<Self, EchoError>
    where
        I: IntoIterator<Item = (u32, Arc<dyn CommandHandler>)>,
    {
        let mut handlers = HashMap::new();
        for (command, handler) in pairs {
            if handlers.insert(command, handler).is_some() {
                return Err(EchoError::DuplicateCommand(command));
            }
        }
        Ok(Self { handlers })
    }

    /// The table the server ships with: heartbeat and echo.
    pub fn standard() -> Self {
        let mut handlers: HashMap<u32, Arc<dyn CommandHandler>> = HashMap::new();
        handlers.insert(HEARTBEAT_CMD, Arc::new(HeartbeatHandler));
        handlers.insert(ECHO_CMD, Arc::new(EchoHandler));
        Self { handlers }
    }

    pub fn resolve(&self, command: u32) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&command).cloned()
    }

    /// The registered command identifiers, sorted.
    pub fn commands(&self) -> Vec<u32> {
        let mut commands: Vec<u32> = self.handlers.keys().copied().collect();
        commands.sort_unstable();
        commands
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("commands", &self.commands())
            .finish()
    }
}
