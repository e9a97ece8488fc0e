// src/core/protocol/mod.rs

pub mod codec;
pub mod package;
pub use codec::{EchoPackageCodec, Inbound};
pub use package::{ECHO_CMD, EchoHeader, EchoPackage, HEARTBEAT_CMD};
