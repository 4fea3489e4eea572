//! Driver-incentive dashboard API proxy.
//!
//! Relays browser requests under a public prefix to the incentive backend,
//! adding CORS and answering preflights itself.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
