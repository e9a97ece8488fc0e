// src/core/protocol/codec.rs

//! Implements the `Encoder` and `Decoder` that frame `EchoPackage`s on a byte stream.

use super::package::{ECHO_PACKAGE_MAGIC, EchoHeader, EchoPackage, HEADER_LEN};
use crate::core::EchoError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Default upper bound for a package body.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4096;

/// One unit delivered by the decoder.
///
/// A frame whose header is valid but whose body cannot be decoded is still
/// delimited correctly, so it is handed up as `Malformed` instead of failing
/// the whole stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Package(EchoPackage),
    Malformed { header: EchoHeader, reason: String },
}

/// A `tokio_util::codec` implementation for encoding and decoding `EchoPackage`s.
#[derive(Debug, Clone)]
pub struct EchoPackageCodec {
    max_message_len: usize,
}

impl Default for EchoPackageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_LEN)
    }
}

impl EchoPackageCodec {
    /// Creates a codec that refuses bodies longer than `max_message_len` bytes.
    /// The length field is 16 bits wide, so larger limits are clamped.
    pub fn new(max_message_len: usize) -> Self {
        Self {
            max_message_len: max_message_len.min(u16::MAX as usize),
        }
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }
}

impl Encoder<EchoPackage> for EchoPackageCodec {
    type Error = EchoError;

    fn encode(&mut self, item: EchoPackage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body_len = item.body.len();
        if body_len > self.max_message_len {
            return Err(EchoError::InvalidPackage(format!(
                "body of {body_len} bytes exceeds the {} byte limit",
                self.max_message_len
            )));
        }

        dst.reserve(HEADER_LEN + body_len);
        dst.put_u32(ECHO_PACKAGE_MAGIC);
        dst.put_u32(item.header.log_id);
        dst.put_u32(item.header.sequence);
        dst.put_u32(item.header.service_id);
        dst.put_u32(item.header.command);
        dst.put_i32(item.header.code);
        dst.put_u16(body_len as u16);
        dst.extend_from_slice(&item.body);
        Ok(())
    }
}

impl Decoder for EchoPackageCodec {
    type Item = Inbound;
    type Error = EchoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        let mut peek = &src[..HEADER_LEN];
        let magic = peek.get_u32();
        if magic != ECHO_PACKAGE_MAGIC {
            return Err(EchoError::Protocol(format!(
                "bad package magic {magic:#010x}"
            )));
        }

        // The body length is the last header field.
        let body_len = u16::from_be_bytes([src[HEADER_LEN - 2], src[HEADER_LEN - 1]]) as usize;
        if body_len > self.max_message_len {
            return Err(EchoError::Protocol(format!(
                "package body of {body_len} bytes exceeds the {} byte limit",
                self.max_message_len
            )));
        }

        let frame_len = HEADER_LEN + body_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(frame_len);
        frame.advance(4);
        let header = EchoHeader {
            log_id: frame.get_u32(),
            sequence: frame.get_u32(),
            service_id: frame.get_u32(),
            command: frame.get_u32(),
            code: frame.get_i32(),
        };
        frame.advance(2);
        let body = frame.freeze();

        if let Err(e) = std::str::from_utf8(&body) {
            return Ok(Some(Inbound::Malformed {
                header,
                reason: EchoError::from(e).to_string(),
            }));
        }

        Ok(Some(Inbound::Package(EchoPackage { header, body })))
    }
}
