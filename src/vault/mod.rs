//! Vault module for the provider core
//!
//! This module implements the HTTP side of talking to HashiCorp Vault: the
//! API client every handler goes through, credential bootstrap, and the
//! status/version queries used to gate optional request fields.
//!
//! ## Testing strategy:
//! - Each module contains its own unit tests within a `#[cfg(test)] mod tests` block
//! - HTTP behaviour is checked against `wiremock` mock servers
//! - Tests against a real Vault dev server live in `tests/` and are ignored by default

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
pub mod status;
pub mod version;

// Re-export key types for convenience
pub use client::{RetryPolicy, VaultClient};
pub use error::VaultError;
pub use status::ServerInfo;
pub use version::VaultVersion;
