//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, dispatch)
//!     → cors.rs (OPTIONS short-circuit)
//!     → headers.rs (inbound → upstream header filter)
//!     → forward.rs (upstream call, body relay)
//!     → headers.rs (upstream → caller filter + CORS overlay)
//!     → Send to client
//! ```

pub mod cors;
pub mod diagnostics;
pub mod forward;
pub mod headers;
pub mod server;

pub use forward::{ForwardRequest, ForwardResponse, Forwarder, RelayBody};
pub use server::{build_router, AppState, HttpServer, ProxyRuntime};
