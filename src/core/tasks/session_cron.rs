// src/core/tasks/session_cron.rs

use crate::core::lifecycle::{SessionLifecycle, SessionListener};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Periodically runs `on_cron` for every tracked session so idle ones get evicted.
pub struct SessionCronTask {
    lifecycle: Arc<SessionLifecycle>,
    period: Duration,
}

impl SessionCronTask {
    pub fn new(lifecycle: Arc<SessionLifecycle>, period: Duration) -> Self {
        Self { lifecycle, period }
    }

    /// Runs the sweep loop until the shutdown signal fires.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Session cron task started. Sweep interval: {:?}", self.period);
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = self.sweep();
                    if evicted > 0 {
                        debug!("Session cron: evicted {} idle sessions.", evicted);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Session cron task shutting down.");
                    return;
                }
            }
        }
    }

    /// Performs one pass over a snapshot of the registry and returns how many
    /// sessions were evicted.
    pub fn sweep(&self) -> usize {
        self.lifecycle
            .registry()
            .snapshot_for_cron()
            .iter()
            .filter(|entry| self.lifecycle.on_cron(&entry.handle))
            .count()
    }
}
