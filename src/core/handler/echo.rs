// src/core/handler/echo.rs

use super::{CommandHandler, HandlerContext};
use crate::core::EchoError;
use crate::core::protocol::EchoPackage;
use async_trait::async_trait;
use tracing::debug;

/// Sends every package back to its sender unchanged, empty bodies included.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        package: EchoPackage,
    ) -> Result<(), EchoError> {
        debug!("Session {}: echo package {}", ctx.handle.id, package);
        ctx.reply(package).await
    }
}
