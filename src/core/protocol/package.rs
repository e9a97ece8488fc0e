// src/core/protocol/package.rs

//! The echo package: a fixed-size header followed by a short text body.

use bytes::Bytes;
use std::fmt;

/// Every header starts with this value; anything else means the stream is out of sync.
pub const ECHO_PACKAGE_MAGIC: u32 = 0x2016_0905;

/// Encoded header size: six 32-bit fields plus the 16-bit body length.
pub const HEADER_LEN: usize = 26;

/// Keep-alive ping. Answered with a header-only package.
pub const HEARTBEAT_CMD: u32 = 0;
/// Echo the body back to the sender.
pub const ECHO_CMD: u32 = 1;

/// The package header. `len` is not stored; it is derived from the body when encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoHeader {
    pub log_id: u32,
    pub sequence: u32,
    pub service_id: u32,
    /// The dispatch key used to pick a command handler.
    pub command: u32,
    /// `0` on success; replies use it to carry an error code.
    pub code: i32,
}

/// A single decoded application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoPackage {
    pub header: EchoHeader,
    pub body: Bytes,
}

impl EchoPackage {
    /// Creates a package for `command` carrying `body`.
    pub fn new(command: u32, body: impl Into<Bytes>) -> Self {
        Self {
            header: EchoHeader {
                command,
                ..EchoHeader::default()
            },
            body: body.into(),
        }
    }

    /// Sets the sequence number, for building requests in a chain.
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.header.sequence = sequence;
        self
    }

    pub fn command(&self) -> u32 {
        self.header.command
    }

    /// A header-only reply that mirrors the request's identifiers.
    pub fn empty_reply(&self) -> Self {
        Self {
            header: EchoHeader {
                code: 0,
                ..self.header
            },
            body: Bytes::new(),
        }
    }
}

impl fmt::Display for EchoPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{log_id:{}, seq:{}, service:{}, cmd:{}, code:{}, body:{:?}}}",
            self.header.log_id,
            self.header.sequence,
            self.header.service_id,
            self.header.command,
            self.header.code,
            String::from_utf8_lossy(&self.body)
        )
    }
}
