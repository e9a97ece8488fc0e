// src/connection/session.rs

//! Defines `TcpSession`, the transport-side implementation of `Session`.

use crate::core::EchoError;
use crate::core::protocol::EchoPackage;
use crate::core::session::Session;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

/// The receiving ends a connection task drains for one `TcpSession`.
pub struct SessionChannels {
    /// Replies queued by command handlers.
    pub outbound_rx: mpsc::Receiver<EchoPackage>,
    /// Fires when someone calls `close`.
    pub kill_rx: broadcast::Receiver<()>,
}

/// One accepted TCP connection as seen by the session core.
///
/// Replies are not written to the socket directly; they go through a bounded
/// queue that the connection task flushes, so a slow peer shows up as a full
/// queue and `write_with_timeout` gives up after its deadline.
pub struct TcpSession {
    addr: SocketAddr,
    created: Instant,
    last_active: Mutex<Instant>,
    outbound_tx: mpsc::Sender<EchoPackage>,
    kill_tx: broadcast::Sender<()>,
    closed: AtomicBool,
}

impl TcpSession {
    /// Creates a session for the peer at `addr` with room for `queue_size` pending replies.
    pub fn new(addr: SocketAddr, queue_size: usize) -> (Self, SessionChannels) {
        let (outbound_tx, outbound_rx) = mpsc::channel(queue_size.max(1));
        let (kill_tx, kill_rx) = broadcast::channel(1);
        let now = Instant::now();
        let session = Self {
            addr,
            created: now,
            last_active: Mutex::new(now),
            outbound_tx,
            kill_tx,
            closed: AtomicBool::new(false),
        };
        (
            session,
            SessionChannels {
                outbound_rx,
                kill_rx,
            },
        )
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Records traffic on the connection.
    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Session for TcpSession {
    async fn write_with_timeout(
        &self,
        package: EchoPackage,
        timeout: Duration,
    ) -> Result<(), EchoError> {
        if self.is_closed() {
            return Err(EchoError::SessionClosed);
        }
        match tokio::time::timeout(timeout, self.outbound_tx.send(package)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(EchoError::SessionClosed),
            Err(_) => Err(EchoError::WriteTimeout(timeout)),
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // The connection task may already be gone; nothing left to signal then.
            let _ = self.kill_tx.send(());
        }
    }

    fn last_active(&self) -> Instant {
        *self.last_active.lock()
    }

    fn describe(&self) -> String {
        let now = Instant::now();
        format!(
            "{{peer:{}, age:{:?}, idle:{:?}}}",
            self.addr,
            now.saturating_duration_since(self.created),
            now.saturating_duration_since(self.last_active())
        )
    }
}

impl fmt::Debug for TcpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpSession")
            .field("addr", &self.addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}
