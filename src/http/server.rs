//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Hold the current runtime snapshot and swap it on config reload
//! - Dispatch: diagnostics → prefix check → preflight → locate → forward

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::RuntimeError;
use crate::http::forward::{ForwardRequest, Forwarder};
use crate::http::{cors, diagnostics};
use crate::observability::metrics;
use crate::routing::{BackendLocator, PathTranslator};

/// Everything a request needs, compiled from one validated config.
#[derive(Debug)]
pub struct ProxyRuntime {
    pub locator: BackendLocator,
    pub translator: PathTranslator,
    pub forwarder: Forwarder,
    pub diagnostics_path: String,
}

impl ProxyRuntime {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RuntimeError> {
        let client = Forwarder::build_client(&config.timeouts)?;
        Ok(Self {
            locator: BackendLocator::from_config(&config.backend)?,
            translator: PathTranslator::new(
                config.routing.public_prefix.clone(),
                config.routing.upstream_prefix.clone(),
            ),
            forwarder: Forwarder::new(client, &config.timeouts, config.relay.clone()),
            diagnostics_path: config.routing.diagnostics_path.clone(),
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ArcSwap<ProxyRuntime>>,
}

impl AppState {
    pub fn new(runtime: ProxyRuntime) -> Self {
        Self {
            runtime: Arc::new(ArcSwap::from_pointee(runtime)),
        }
    }

    /// Replace the runtime; in-flight requests keep the snapshot they loaded.
    pub fn apply_config(&self, config: &ProxyConfig) -> Result<(), RuntimeError> {
        let runtime = ProxyRuntime::from_config(config)?;
        self.runtime.store(Arc::new(runtime));
        Ok(())
    }
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, RuntimeError> {
        let state = AppState::new(ProxyRuntime::from_config(&config)?);
        let router = build_router(state.clone());
        Ok(Self { router, state })
    }

    /// The fully layered router, for driving the proxy without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, applying config updates
    /// as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match state.apply_config(&config) {
                    Ok(()) => tracing::info!(
                        public_prefix = %config.routing.public_prefix,
                        upstream_prefix = %config.routing.upstream_prefix,
                        backend_configured = config.backend.url.is_some(),
                        "Configuration reloaded"
                    ),
                    Err(e) => tracing::error!(error = %e, "Rejected reloaded configuration"),
                }
            }
        });

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/{*path}", any(proxy_handler))
        .route("/", any(proxy_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let runtime = state.runtime.load_full();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = dispatch(&runtime, request, &method, &path, &request_id).await;
    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

async fn dispatch(
    runtime: &ProxyRuntime,
    request: Request<Body>,
    method: &Method,
    path: &str,
    request_id: &str,
) -> Response {
    if path == runtime.diagnostics_path {
        return diagnostics::whoami(method, path);
    }

    let Some(upstream_path) = runtime.translator.translate(path) else {
        tracing::debug!(request_id = %request_id, path = %path, "Path outside public prefix");
        return diagnostics::not_found();
    };

    if *method == Method::OPTIONS {
        return cors::preflight();
    }

    let base = match runtime.locator.resolve() {
        Ok(base) => base,
        Err(e) => {
            tracing::error!(request_id = %request_id, "No backend URL configured and no fallback");
            metrics::record_upstream_error(e.kind());
            return e.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        upstream_path = %upstream_path,
        "Proxying request"
    );

    let forward = ForwardRequest::from_inbound(request, upstream_path);
    match runtime.forwarder.forward(base, forward).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream_error(e.kind());
            e.into_response()
        }
    }
}
