// src/config.rs

//! Manages server configuration: loading from TOML, defaults, and validation.

use crate::core::protocol::codec::DEFAULT_MAX_MESSAGE_LEN;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Per-session limits and transport parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// The maximum number of sessions admitted at the same time.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// A session with no traffic for longer than this is evicted by the cron sweep.
    #[serde(with = "humantime_serde", default = "default_idle_timeout")]
    pub idle_timeout: Duration,
    /// The longest a handler may wait to queue a reply.
    #[serde(with = "humantime_serde", default = "default_wait_timeout")]
    pub wait_timeout: Duration,
    /// How often the cron sweep visits every session.
    #[serde(with = "humantime_serde", default = "default_cron_period")]
    pub cron_period: Duration,
    #[serde(default = "default_tcp_no_delay")]
    pub tcp_no_delay: bool,
    /// Capacity of each session's outbound reply queue.
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
    /// The largest package body accepted or sent, in bytes.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

fn default_max_sessions() -> usize {
    10000
}
fn default_idle_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_wait_timeout() -> Duration {
    Duration::from_secs(3)
}
fn default_cron_period() -> Duration {
    Duration::from_secs(1)
}
fn default_tcp_no_delay() -> bool {
    true
}
fn default_outbound_queue_size() -> usize {
    64
}
fn default_max_message_len() -> usize {
    DEFAULT_MAX_MESSAGE_LEN
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout: default_idle_timeout(),
            wait_timeout: default_wait_timeout(),
            cron_period: default_cron_period(),
            tcp_no_delay: default_tcp_no_delay(),
            outbound_queue_size: default_outbound_queue_size(),
            max_message_len: default_max_message_len(),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    10001
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

/// Represents the final, validated server configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    10000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            session: SessionConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }

        let session = &self.session;
        if session.max_sessions == 0 {
            return Err(anyhow!("session.max_sessions cannot be 0"));
        }
        if session.idle_timeout.is_zero() {
            return Err(anyhow!("session.idle_timeout cannot be 0"));
        }
        if session.wait_timeout.is_zero() {
            return Err(anyhow!("session.wait_timeout cannot be 0"));
        }
        if session.cron_period.is_zero() {
            return Err(anyhow!("session.cron_period cannot be 0"));
        }
        if session.outbound_queue_size == 0 {
            return Err(anyhow!("session.outbound_queue_size cannot be 0"));
        }
        if session.max_message_len == 0 || session.max_message_len > u16::MAX as usize {
            return Err(anyhow!(
                "session.max_message_len must be between 1 and {}",
                u16::MAX
            ));
        }
        if session.cron_period > session.idle_timeout {
            warn!(
                "session.cron_period ({:?}) is longer than session.idle_timeout ({:?}); idle sessions will linger past their timeout.",
                session.cron_period, session.idle_timeout
            );
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }
}
