//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → translator.rs (is the path under the public prefix? upstream path?)
//!     → locator.rs (which backend base URL?)
//!     → upstream_url(base, upstream path, raw query)
//! ```
//!
//! # Design Decisions
//! - One backend, no load balancing
//! - Prefix rewrite only, no regex, no per-route rules
//! - Deterministic: same input always yields the same target

pub mod locator;
pub mod translator;

pub use locator::BackendLocator;
pub use translator::{upstream_url, PathTranslator};
