//! # keel_core
//!
//! Core primitives shared by every Keel service: bearer-token minting and
//! verification, the request principal, settings loading, logging setup,
//! and mutual-TLS credential assembly.

pub mod auth;
pub mod config;
pub mod logging;
pub mod random;
pub mod tls;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
