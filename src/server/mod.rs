// src/server/mod.rs

use crate::config::Config;
use crate::core::state::ServerState;
use anyhow::Result;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

mod connection_loop;
mod context;
mod initialization;
mod metrics_server;
mod spawner;

pub use connection_loop::shutdown_signal;
pub use context::ServerContext;

/// The main server startup function: runs until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    Server::bind(config).await?.run_until(shutdown_signal()).await
}

/// A bound, not yet running server.
pub struct Server {
    ctx: ServerContext,
}

impl Server {
    /// Initializes the shared state and binds the listener.
    pub async fn bind(config: Config) -> Result<Self> {
        let ctx = initialization::setup(config).await?;
        Ok(Self { ctx })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.ctx.listener.local_addr()?)
    }

    pub fn state(&self) -> Arc<ServerState> {
        self.ctx.state.clone()
    }

    /// Spawns the background tasks and accepts connections until `shutdown` resolves.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        spawner::spawn_all(&mut self.ctx);
        connection_loop::run(self.ctx, shutdown).await;
        Ok(())
    }
}
