//! vault-provider - namespace-aware Vault client resolution for infrastructure providers
//!
//! This crate is the core an infrastructure-as-code provider for HashiCorp
//! Vault is built on. Resource handlers never construct Vault clients
//! themselves; they ask the provider metadata for one, and the metadata
//! hands out a client bound to the right namespace.
//!
//! ## Architecture
//!
//! - `vault` module - HTTP client, credential bootstrap, server status/version
//! - `provider` module - configuration, `ProviderMeta`, the client resolver
//!   and the named mutex table
//! - `interface` module - the narrow traits handlers depend on
//! - `resources` module - resource handlers built on the above
//! - `cli` module - command-line front end for inspecting a configuration
//!
//! Handlers depend on [`interface::ProviderContext`] (client resolution,
//! capabilities and the mutex table) rather than on `ProviderMeta`, which
//! keeps them testable against any implementation.

pub mod cli;
pub mod interface;
pub mod provider;
pub mod resources;
pub mod vault;

// Re-export public types for convenience
pub use interface::{Capabilities, ClientResolver, ProviderContext};
pub use provider::{
    get_client, InstanceState, MutexKv, OperationContext, ProviderConfig, ProviderError,
    ProviderMeta, ResourceData,
};
pub use vault::{VaultClient, VaultError, VaultVersion};

/// Initialize logging for unit tests
#[cfg(test)]
pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer() // This ensures output goes to both stdout and test output
        .try_init();
}
