// src/core/handler/heartbeat.rs

use super::{CommandHandler, HandlerContext};
use crate::core::EchoError;
use crate::core::protocol::EchoPackage;
use async_trait::async_trait;
use tracing::debug;

/// Answers a keep-alive ping with a header-only package carrying the same sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatHandler;

#[async_trait]
impl CommandHandler for HeartbeatHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        package: EchoPackage,
    ) -> Result<(), EchoError> {
        debug!(
            "Session {}: heartbeat seq {}",
            ctx.handle.id, package.header.sequence
        );
        ctx.reply(package.empty_reply()).await
    }
}
