//! Upstream request execution and response relay.
//!
//! # Responsibilities
//! - Send exactly one upstream request per inbound request
//! - Stream the inbound body upstream (dropped for GET/HEAD)
//! - Relay upstream redirects untouched instead of following them
//! - Relay the response body chunk by chunk, or buffered when configured
//! - Turn every transport failure into a `ProxyError`
//!
//! # Data Flow
//! ```text
//! ForwardRequest
//!     → upstream_url(base, path, raw query)
//!     → reqwest (timeout around connect + headers)
//!     → relay_response_headers
//!     → RelayBody::Streaming | RelayBody::Buffered
//!     → ForwardResponse → axum Response
//! ```
//!
//! Dropping the returned body (caller gone) drops the upstream response and
//! with it the upstream connection, so no further chunks are read.

use std::time::Duration;

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use tokio::time::Instant;
use axum::response::{IntoResponse, Response};
use futures_util::{stream, StreamExt, TryStreamExt};
use url::Url;

use crate::config::{RelayConfig, RelayMode, TimeoutConfig};
use crate::error::{diagnostic, ProxyError};
use crate::http::headers;
use crate::observability::metrics;
use crate::routing::upstream_url;

/// GET and HEAD never carry a body upstream.
pub fn is_bodiless(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// True when `body` is known to carry no bytes and the caller declared no
/// chunked framing for it.
fn is_empty_body(body: &Body, headers: &HeaderMap) -> bool {
    body.size_hint().exact() == Some(0) && !headers.contains_key(header::TRANSFER_ENCODING)
}

/// A request ready to be sent upstream.
#[derive(Debug)]
pub struct ForwardRequest {
    pub method: Method,
    pub upstream_path: String,
    /// Raw query, without the `?`. `Some("")` for a bare `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl ForwardRequest {
    /// Take an inbound request apart for forwarding to `upstream_path`.
    ///
    /// A body known to be empty is not forwarded, so the upstream sees no
    /// chunked framing the caller never sent.
    pub fn from_inbound(request: Request<Body>, upstream_path: String) -> Self {
        let (parts, body) = request.into_parts();
        let bodiless = is_bodiless(&parts.method);
        let send_body = !bodiless && !is_empty_body(&body, &parts.headers);

        Self {
            headers: headers::forward_request_headers(&parts.headers, bodiless),
            query: parts.uri.query().map(str::to_owned),
            body: send_body.then_some(body),
            method: parts.method,
            upstream_path,
        }
    }
}

/// Upstream response body as relayed to the caller.
#[derive(Debug)]
pub enum RelayBody {
    Streaming(Body),
    Buffered(Bytes),
}

/// The upstream reply after header filtering.
#[derive(Debug)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: RelayBody,
}

impl IntoResponse for ForwardResponse {
    fn into_response(self) -> Response {
        let body = match self.body {
            RelayBody::Streaming(body) => body,
            RelayBody::Buffered(bytes) => Body::from(bytes),
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Executes forward requests against a backend.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    upstream_timeout: Duration,
    relay: RelayConfig,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, timeouts: &TimeoutConfig, relay: RelayConfig) -> Self {
        Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
            relay,
        }
    }

    /// Client used for upstream calls: no redirect following, no overall
    /// timeout (long bodies must be able to stream), bounded connect.
    pub fn build_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
    }

    /// Send `request` to `base` and prepare the reply for relay.
    pub async fn forward(
        &self,
        base: &Url,
        request: ForwardRequest,
    ) -> Result<ForwardResponse, ProxyError> {
        let target = upstream_url(base, &request.upstream_path, request.query.as_deref());

        let mut builder = self
            .client
            .request(request.method, &target)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        let upstream_request = builder.build().map_err(|e| ProxyError::InvalidTarget {
            url: target.clone(),
            reason: diagnostic(&e),
        })?;

        tracing::debug!(target = %target, method = %upstream_request.method(), "Forwarding upstream");

        let deadline = Instant::now() + self.upstream_timeout;
        let response =
            match tokio::time::timeout_at(deadline, self.client.execute(upstream_request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(ProxyError::unreachable(&e)),
                Err(_) => return Err(ProxyError::UpstreamTimeout(self.upstream_timeout)),
            };

        let status = response.status();
        let headers = headers::relay_response_headers(response.headers());
        let body = match self.relay.mode {
            RelayMode::Buffered => {
                RelayBody::Buffered(read_buffered(response, self.relay.max_buffered_bytes).await?)
            }
            RelayMode::Streaming => {
                RelayBody::Streaming(self.stream_body(response, deadline).await?)
            }
        };

        Ok(ForwardResponse {
            status,
            headers,
            body,
        })
    }

    /// The first chunk shares `deadline` with the header exchange. Later
    /// chunks are not time-bounded.
    async fn stream_body(
        &self,
        mut response: reqwest::Response,
        deadline: Instant,
    ) -> Result<Body, ProxyError> {
        if !self.relay.await_first_chunk {
            return Ok(Body::from_stream(abort_on_error(response.bytes_stream())));
        }

        // Nothing is committed to the caller yet, so a failure here is still a clean 502.
        let first = match tokio::time::timeout_at(deadline, response.chunk()).await {
            Ok(chunk) => chunk.map_err(|e| ProxyError::UpstreamStream(diagnostic(&e)))?,
            Err(_) => return Err(ProxyError::UpstreamTimeout(self.upstream_timeout)),
        };

        match first {
            None => Ok(Body::empty()),
            Some(first) => {
                let rest = response.bytes_stream();
                let chained = stream::once(async move { Ok(first) }).chain(rest);
                Ok(Body::from_stream(abort_on_error(chained)))
            }
        }
    }
}

/// Pass chunks through in order; an upstream error ends the caller's body
/// with an error, which aborts the connection instead of a clean EOF.
fn abort_on_error<S>(
    chunks: S,
) -> impl futures_util::Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static
where
    S: futures_util::Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    chunks.inspect_err(|e| {
        metrics::record_stream_abort();
        tracing::warn!(error = %diagnostic(e), "Upstream body failed mid-stream, aborting relay");
    })
}

async fn read_buffered(mut response: reqwest::Response, limit: usize) -> Result<Bytes, ProxyError> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(ProxyError::UpstreamBodyTooLarge { limit });
    }

    let mut buffer = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProxyError::UpstreamStream(diagnostic(&e)))?
    {
        if buffer.len() + chunk.len() > limit {
            return Err(ProxyError::UpstreamBodyTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buffer))
}
