// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: framing, the
//! transport-side `Session` implementation, and cleanup.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::{SessionChannels, TcpSession};
