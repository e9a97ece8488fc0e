// src/server/spawner.rs

//! Spawns all of the server's long-running background tasks.

use super::context::ServerContext;
use super::metrics_server;
use crate::core::tasks::SessionCronTask;
use tracing::info;

/// Spawns all background tasks into the context's JoinSet.
pub fn spawn_all(ctx: &mut ServerContext) {
    let server_state = &ctx.state;
    let shutdown_tx = &ctx.shutdown_tx;
    let background_tasks = &mut ctx.background_tasks;

    // --- Metrics Server ---
    if server_state.config.metrics.enabled {
        let metrics_state = server_state.clone();
        let shutdown_rx_metrics = shutdown_tx.subscribe();
        background_tasks.spawn(async move {
            metrics_server::run_metrics_server(metrics_state, shutdown_rx_metrics).await;
            Ok(())
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    // --- Session Maintenance ---
    let cron = SessionCronTask::new(
        server_state.lifecycle.clone(),
        server_state.config.session.cron_period,
    );
    let shutdown_rx_cron = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        cron.run(shutdown_rx_cron).await;
        Ok(())
    });

    info!("All background tasks have been spawned.");
}
