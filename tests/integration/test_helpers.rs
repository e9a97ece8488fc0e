// tests/integration/test_helpers.rs

//! Test helpers: an in-memory `Session`, scripted command handlers, and a
//! lifecycle builder.

#![allow(dead_code)]

use async_trait::async_trait;
use echo_server::core::handler::{CommandHandler, HandlerContext, HandlerTable};
use echo_server::core::protocol::{ECHO_CMD, EchoPackage};
use echo_server::core::session::{Session, SessionHandle, SessionId};
use echo_server::core::{EchoError, SessionLifecycle, SessionSettings};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Sets up minimal tracing for tests (ignores the error if already initialized).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
}

/// A `Session` that records everything the core does to it.
#[derive(Debug)]
pub struct MockSession {
    name: String,
    last_active: Mutex<Instant>,
    written: Mutex<Vec<EchoPackage>>,
    close_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MockSession {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            last_active: Mutex::new(Instant::now()),
            written: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        })
    }

    /// Marks the session as active right now.
    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    /// Makes every following write fail as if the peer stopped reading.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<EchoPackage> {
        self.written.lock().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for MockSession {
    async fn write_with_timeout(
        &self,
        package: EchoPackage,
        timeout: Duration,
    ) -> Result<(), EchoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EchoError::WriteTimeout(timeout));
        }
        self.written.lock().push(package);
        Ok(())
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn last_active(&self) -> Instant {
        *self.last_active.lock()
    }

    fn describe(&self) -> String {
        format!("{{mock:{}}}", self.name)
    }
}

/// Wraps a mock session into the handle the lifecycle callbacks take.
pub fn handle(id: SessionId, session: &Arc<MockSession>) -> SessionHandle {
    SessionHandle::new(id, session.clone())
}

/// A handler that counts invocations and either succeeds or fails on demand.
#[derive(Debug, Default)]
pub struct ScriptedHandler {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl ScriptedHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let handler = Self::new();
        handler.fail.store(true, Ordering::SeqCst);
        handler
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandHandler for ScriptedHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        package: EchoPackage,
    ) -> Result<(), EchoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EchoError::InvalidPackage("scripted failure".into()));
        }
        ctx.reply(package).await
    }
}

pub fn settings(max_sessions: usize, idle_timeout: Duration) -> SessionSettings {
    SessionSettings {
        max_sessions,
        idle_timeout,
        wait_timeout: Duration::from_millis(200),
    }
}

/// A lifecycle whose table maps `ECHO_CMD` to `handler`.
pub fn lifecycle_with(
    max_sessions: usize,
    idle_timeout: Duration,
    handler: Arc<ScriptedHandler>,
) -> SessionLifecycle {
    let table = HandlerTable::new([(ECHO_CMD, handler as Arc<dyn CommandHandler>)])
        .expect("single registration cannot collide");
    SessionLifecycle::new(settings(max_sessions, idle_timeout), table)
}

/// A lifecycle with the standard handler table.
pub fn standard_lifecycle(max_sessions: usize, idle_timeout: Duration) -> SessionLifecycle {
    SessionLifecycle::new(
        settings(max_sessions, idle_timeout),
        HandlerTable::standard(),
    )
}

pub fn echo_package(body: &str) -> EchoPackage {
    EchoPackage::new(ECHO_CMD, body.to_string())
}
