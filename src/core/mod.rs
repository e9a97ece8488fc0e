// src/core/mod.rs

//! The session registry and dispatch engine, plus the protocol and tasks around it.

pub mod errors;
pub mod handler;
pub mod lifecycle;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod state;
pub mod tasks;

pub use errors::EchoError;
pub use lifecycle::{Dispatch, SessionLifecycle, SessionListener, SessionSettings};
