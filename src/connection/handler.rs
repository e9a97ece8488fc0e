// src/connection/handler.rs

//! Defines the `ConnectionHandler` which drives one client connection through
//! the session lifecycle callbacks.

use super::guard::ConnectionGuard;
use super::session::{SessionChannels, TcpSession};
use crate::config::SessionConfig;
use crate::core::EchoError;
use crate::core::lifecycle::SessionListener;
use crate::core::protocol::{EchoPackage, EchoPackageCodec};
use crate::core::session::{Session, SessionHandle, SessionId};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Why the main loop stopped.
enum Exit {
    /// The peer hung up or the session was closed on purpose.
    Closed,
    /// The connection failed.
    Failed(EchoError),
}

/// Drives a single connection: admission, inbound dispatch, outbound replies, teardown.
pub struct ConnectionHandler<S = TcpStream> {
    framed: Framed<S, EchoPackageCodec>,
    session: Arc<TcpSession>,
    handle: SessionHandle,
    listener: Arc<dyn SessionListener>,
    channels: SessionChannels,
    global_shutdown_rx: broadcast::Receiver<()>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a new `ConnectionHandler` for an accepted socket.
    pub fn new(
        socket: S,
        addr: SocketAddr,
        session_id: SessionId,
        listener: Arc<dyn SessionListener>,
        config: &SessionConfig,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let (session, channels) = TcpSession::new(addr, config.outbound_queue_size);
        let session = Arc::new(session);
        let handle = SessionHandle::new(session_id, session.clone());
        Self {
            framed: Framed::new(socket, EchoPackageCodec::new(config.max_message_len)),
            session,
            handle,
            listener,
            channels,
            global_shutdown_rx,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.handle.id
    }

    /// Runs the connection until it closes. Returns an error only if the
    /// session was refused at admission.
    pub async fn run(self) -> Result<(), EchoError> {
        let Self {
            framed,
            session,
            handle,
            listener,
            channels,
            mut global_shutdown_rx,
        } = self;
        let SessionChannels {
            outbound_rx,
            mut kill_rx,
        } = channels;

        listener.on_open(&handle)?;
        let mut guard = ConnectionGuard::new(listener.clone(), handle.clone());

        let (sink, mut stream) = framed.split();
        let mut writer = tokio::spawn(write_loop(sink, outbound_rx, session.clone()));

        let exit = loop {
            tokio::select! {
                // Prioritize shutdown signals over other events.
                biased;
                _ = global_shutdown_rx.recv() => {
                    info!("Session {} received the global shutdown signal.", handle.id);
                    break Exit::Closed;
                }
                _ = kill_rx.recv() => {
                    debug!("Session {} was asked to close.", handle.id);
                    break Exit::Closed;
                }
                res = &mut writer => {
                    break match res {
                        Ok(Ok(())) => Exit::Closed,
                        Ok(Err(e)) => Exit::Failed(e),
                        Err(e) => Exit::Failed(EchoError::Internal(format!("writer task failed: {e}"))),
                    };
                }
                result = stream.next() => {
                    match result {
                        Some(Ok(inbound)) => {
                            session.touch();
                            let outcome = listener.on_message(&handle, inbound).await;
                            debug!("Session {}: dispatch outcome {:?}", handle.id, outcome);
                        }
                        Some(Err(e)) => break Exit::Failed(e),
                        None => {
                            debug!("Session {} closed by peer.", handle.id);
                            break Exit::Closed;
                        }
                    }
                }
            }
        };

        writer.abort();
        session.close();

        match exit {
            Exit::Failed(e) => {
                if e.is_normal_disconnect() {
                    debug!("Session {} disconnected: {}", handle.id, e);
                } else {
                    warn!("Session {} connection error: {}", handle.id, e);
                }
                listener.on_error(&handle, &e);
            }
            Exit::Closed => listener.on_close(&handle),
        }
        guard.release();
        Ok(())
    }
}

/// Flushes queued replies to the socket until the queue closes or a write fails.
async fn write_loop<S>(
    mut sink: SplitSink<Framed<S, EchoPackageCodec>, EchoPackage>,
    mut outbound_rx: mpsc::Receiver<EchoPackage>,
    session: Arc<TcpSession>,
) -> Result<(), EchoError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    while let Some(package) = outbound_rx.recv().await {
        sink.send(package).await?;
        session.touch();
    }
    Ok(())
}
