// src/core/session/registry.rs

//! The concurrency-safe map of live sessions.

use super::{SessionHandle, SessionId, SessionRecord};
use crate::core::EchoError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A point-in-time view of one session, taken for the cron sweep.
#[derive(Debug, Clone)]
pub struct CronEntry {
    pub handle: SessionHandle,
    pub last_active: Instant,
    pub failure_count: u64,
}

impl CronEntry {
    /// Time elapsed since the last observed activity, measured against `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active)
    }
}

/// Holds one `SessionRecord` per live session.
///
/// A single reader/writer lock guards the map. Every method takes the lock for
/// the shortest possible time and never across an `.await`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `handle` unless its id is already registered or `max_sessions`
    /// sessions are. The duplicate check comes first.
    ///
    /// The count check and the insert happen under the same write lock, so two
    /// concurrent admissions can never both take the last free slot.
    pub fn try_admit(&self, handle: SessionHandle, max_sessions: usize) -> Result<(), EchoError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&handle.id) {
            return Err(EchoError::DuplicateSession(handle.id));
        }
        if sessions.len() >= max_sessions {
            return Err(EchoError::TooManySessions);
        }
        sessions.insert(handle.id, SessionRecord::new(handle));
        Ok(())
    }

    /// Removes a session. Removing a non-member is a no-op.
    pub fn remove(&self, id: SessionId) -> bool {
        self.take(id).is_some()
    }

    /// Removes a session and hands its record back to the caller.
    pub fn take(&self, id: SessionId) -> Option<SessionRecord> {
        self.sessions.write().remove(&id)
    }

    /// Bumps the failure counter of a member session and returns the new value.
    /// Returns `None` if the session already left the registry.
    pub fn record_failure(&self, id: SessionId) -> Option<u64> {
        let mut sessions = self.sessions.write();
        let record = sessions.get_mut(&id)?;
        record.failure_count += 1;
        Some(record.failure_count)
    }

    /// Copies out what the cron sweep needs so timeout checks run without the lock.
    pub fn snapshot_for_cron(&self) -> Vec<CronEntry> {
        self.sessions
            .read()
            .values()
            .map(|record| CronEntry {
                handle: record.handle.clone(),
                last_active: record.handle.session.last_active(),
                failure_count: record.failure_count,
            })
            .collect()
    }

    /// Reads the activity state of one member session under the read lock.
    pub fn cron_entry(&self, id: SessionId) -> Option<CronEntry> {
        self.sessions.read().get(&id).map(|record| CronEntry {
            handle: record.handle.clone(),
            last_active: record.handle.session.last_active(),
            failure_count: record.failure_count,
        })
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    pub fn failure_count(&self, id: SessionId) -> Option<u64> {
        self.sessions.read().get(&id).map(|r| r.failure_count)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
