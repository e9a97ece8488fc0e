// src/core/tasks/mod.rs

//! Long-running background tasks that support the server's session management.

pub mod session_cron;

pub use session_cron::SessionCronTask;
