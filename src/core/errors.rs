// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The main error enum, representing every failure a session can run into.
/// None of them are fatal to the process; the worst outcome is closing one connection.
#[derive(Error, Debug, Clone)]
pub enum EchoError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// The byte stream cannot be resynchronized (bad magic, oversized frame).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A frame was delimited correctly but its content could not be decoded.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Too many echo sessions")]
    TooManySessions,

    #[error("Session {0} is already registered")]
    DuplicateSession(u64),

    #[error("Unknown command '{0}'")]
    UnknownCommand(u32),

    #[error("Command '{0}' is registered twice")]
    DuplicateCommand(u32),

    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Session idle for {0:?}")]
    IdleTimeout(Duration),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl EchoError {
    /// Returns true for errors a peer causes by simply going away.
    pub fn is_normal_disconnect(&self) -> bool {
        matches!(self, EchoError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionAborted
        ))
    }
}

impl PartialEq for EchoError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EchoError::Io(e1), EchoError::Io(e2)) => {
                e1.kind() == e2.kind() && e1.to_string() == e2.to_string()
            }
            (EchoError::Protocol(s1), EchoError::Protocol(s2)) => s1 == s2,
            (EchoError::MalformedMessage(s1), EchoError::MalformedMessage(s2)) => s1 == s2,
            (EchoError::DuplicateSession(a), EchoError::DuplicateSession(b)) => a == b,
            (EchoError::UnknownCommand(a), EchoError::UnknownCommand(b)) => a == b,
            (EchoError::DuplicateCommand(a), EchoError::DuplicateCommand(b)) => a == b,
            (EchoError::InvalidPackage(s1), EchoError::InvalidPackage(s2)) => s1 == s2,
            (EchoError::WriteTimeout(a), EchoError::WriteTimeout(b)) => a == b,
            (EchoError::IdleTimeout(a), EchoError::IdleTimeout(b)) => a == b,
            (EchoError::Internal(s1), EchoError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for EchoError {
    fn from(e: std::io::Error) -> Self {
        EchoError::Io(Arc::new(e))
    }
}

impl From<std::str::Utf8Error> for EchoError {
    fn from(e: std::str::Utf8Error) -> Self {
        EchoError::MalformedMessage(format!("body is not valid UTF-8: {e}"))
    }
}
