//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream media-lookup service.
    pub upstream: UpstreamConfig,

    /// Search route settings.
    pub search: SearchConfig,

    /// Outbound connection pool policies.
    pub pools: PoolsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// How long open connections may drain after shutdown is triggered.
    /// Streams still open after this are abandoned.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            shutdown_grace_secs: 30,
        }
    }
}

impl ListenerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Replace the port of the bind address, keeping the host part.
    pub fn with_port(&mut self, port: u16) {
        let host = match self.bind_address.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.bind_address.clone(),
        };
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Upstream service location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream (e.g., "http://localhost:5000").
    pub base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
        }
    }
}

/// Search route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result limit used when the caller omits `limit` or sends it empty.
    pub default_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: 20 }
    }
}

/// The two outbound pool policies.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PoolsConfig {
    /// Bounded request/response calls (health, search, song details).
    pub short: ShortPoolConfig,

    /// Unbounded byte streaming.
    pub streaming: StreamingPoolConfig,
}

/// Settings for the short-lived pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShortPoolConfig {
    /// Maximum idle connections kept per upstream host.
    pub max_idle_per_host: usize,

    /// Idle connections are evicted after this many seconds.
    pub idle_timeout_secs: u64,

    /// Bound on TCP connect plus TLS handshake, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Bound on waiting for the response head, in milliseconds.
    pub response_header_timeout_ms: Option<u64>,

    /// Total round-trip ceiling (head and full body), in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ShortPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 32,
            idle_timeout_secs: 90,
            connect_timeout_ms: 10_000,
            response_header_timeout_ms: None,
            request_timeout_ms: 30_000,
        }
    }
}

/// Settings for the streaming pool.
///
/// No header or total timeout: a media transfer may outlive any fixed budget.
/// Only connection setup is bounded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamingPoolConfig {
    /// Maximum idle connections kept per upstream host.
    pub max_idle_per_host: usize,

    /// Idle connections are evicted after this many seconds.
    pub idle_timeout_secs: u64,

    /// Bound on TCP connect plus TLS handshake, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for StreamingPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 16,
            idle_timeout_secs: 90,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
