//! Request-level errors and their caller-facing responses.

use std::error::Error as StdError;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::http::cors;

/// Everything that can stop a request from being relayed.
///
/// None of these are retried; each is reported to the caller that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No backend URL and no fallback.
    #[error("BACKEND_URL not configured")]
    NotConfigured,

    /// Connect, DNS, TLS or header exchange failed.
    #[error("{0}")]
    UpstreamUnreachable(String),

    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    /// The body failed before anything was committed to the caller.
    #[error("upstream body failed: {0}")]
    UpstreamStream(String),

    #[error("upstream body exceeded {limit} bytes")]
    UpstreamBodyTooLarge { limit: usize },

    #[error("invalid upstream target {url:?}: {reason}")]
    InvalidTarget { url: String, reason: String },
}

impl ProxyError {
    /// Wrap a transport error, keeping its whole source chain as the message.
    pub fn unreachable(err: &(dyn StdError + 'static)) -> Self {
        Self::UpstreamUnreachable(diagnostic(err))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::UpstreamUnreachable(_) => "unreachable",
            Self::UpstreamTimeout(_) => "timeout",
            Self::UpstreamStream(_) => "stream",
            Self::UpstreamBodyTooLarge { .. } => "body_too_large",
            Self::InvalidTarget { .. } => "invalid_target",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::NotConfigured => json!({ "error": "BACKEND_URL not configured" }),
            other => json!({ "error": "Bad gateway", "message": other.to_string() }),
        };

        let mut response = (self.status(), Json(body)).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        cors::apply(headers);
        response
    }
}

/// Failure to turn a validated config into a request-serving runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid backend URL: {0}")]
    BackendUrl(#[from] url::ParseError),
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Render an error and its sources as `outer: inner: root`.
pub fn diagnostic(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
