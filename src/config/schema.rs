//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Literal production backend used when a deployment opts into the fallback.
pub const DEFAULT_FALLBACK_URL: &str = "https://incentive-production.up.railway.app";

/// Root configuration for the forwarding proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream backend location.
    pub backend: BackendConfig,

    /// Public and upstream path prefixes.
    pub routing: RoutingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Response body relay behaviour.
    pub relay: RelayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend configuration.
///
/// `url` normally comes from the `BACKEND_URL` environment variable. When it is
/// absent the proxy either answers 500 or, if `use_fallback` is set, targets
/// `fallback_url`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend base URL (scheme, host and optional port).
    pub url: Option<String>,

    /// Literal URL used when `url` is unset and `use_fallback` is true.
    pub fallback_url: String,

    /// Whether a missing `url` falls back to `fallback_url`.
    pub use_fallback: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            use_fallback: false,
        }
    }
}

/// Path prefixes the proxy translates between.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefix under which the proxy is mounted for callers.
    pub public_prefix: String,

    /// Prefix the backend mounts its routes under. May be empty.
    pub upstream_prefix: String,

    /// Path of the liveness/diagnostic endpoint.
    pub diagnostics_path: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            public_prefix: "/api/proxy".to_string(),
            upstream_prefix: "/api".to_string(),
            diagnostics_path: "/api/whoami".to_string(),
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for connect plus the response header exchange, in seconds.
    /// Body streaming is not bounded by it.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// How upstream response bodies are relayed to the caller.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Chunk-by-chunk relay, never holding the whole body.
    #[default]
    Streaming,
    /// Read the whole body into memory, then write it once.
    Buffered,
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub mode: RelayMode,

    /// Hold the status line until the first body chunk (or end of body) is
    /// available, so early stream failures still produce a clean 502.
    pub await_first_chunk: bool,

    /// Upper bound on a buffered body, in bytes.
    pub max_buffered_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: RelayMode::Streaming,
            await_first_chunk: true,
            max_buffered_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
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
