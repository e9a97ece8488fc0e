// src/core/session/record.rs

use super::SessionHandle;
use tokio::time::Instant;

/// Per-connection bookkeeping kept by the registry.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub handle: SessionHandle,
    /// Number of requests whose handler returned an error. Diagnostic only.
    pub failure_count: u64,
    pub admitted_at: Instant,
}

impl SessionRecord {
    pub(crate) fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            failure_count: 0,
            admitted_at: Instant::now(),
        }
    }
}
