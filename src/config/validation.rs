//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check path prefixes are well formed
//! - Check backend URLs parse and use an HTTP scheme
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }

    if let Some(url) = &config.backend.url {
        if let Err(msg) = check_backend_url(url) {
            errors.push(ValidationError::new("backend.url", msg));
        }
    }
    if config.backend.use_fallback {
        if let Err(msg) = check_backend_url(&config.backend.fallback_url) {
            errors.push(ValidationError::new("backend.fallback_url", msg));
        }
    }

    let public = &config.routing.public_prefix;
    if public == "/" || public.is_empty() {
        errors.push(ValidationError::new(
            "routing.public_prefix",
            "must name a path segment, not the root",
        ));
    } else if let Err(msg) = check_prefix(public) {
        errors.push(ValidationError::new("routing.public_prefix", msg));
    }

    let upstream = &config.routing.upstream_prefix;
    if !upstream.is_empty() {
        if let Err(msg) = check_prefix(upstream) {
            errors.push(ValidationError::new("routing.upstream_prefix", msg));
        }
    }

    if !config.routing.diagnostics_path.starts_with('/') {
        errors.push(ValidationError::new(
            "routing.diagnostics_path",
            "must start with '/'",
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be > 0"));
    }
    if config.relay.max_buffered_bytes == 0 {
        errors.push(ValidationError::new("relay.max_buffered_bytes", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "not a socket address: {:?}",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_prefix(prefix: &str) -> Result<(), String> {
    if !prefix.starts_with('/') {
        return Err(format!("{prefix:?} must start with '/'"));
    }
    if prefix.len() > 1 && prefix.ends_with('/') {
        return Err(format!("{prefix:?} must not end with '/'"));
    }
    if prefix.contains('?') || prefix.contains('#') {
        return Err(format!("{prefix:?} must be a bare path"));
    }
    Ok(())
}

fn check_backend_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("{raw:?}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{raw:?}: unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(format!("{raw:?}: missing host"));
    }
    Ok(())
}
