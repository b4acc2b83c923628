//! Provider core: configuration, the provider metadata object, namespace-aware
//! client resolution and the named mutex table.
//!
//! ## Architectural role:
//! - `ProviderMeta` is built once per provider configuration and shared by
//!   every concurrent handler invocation
//! - Handlers obtain clients through [`get_client`] and serialize
//!   check-then-act sequences through [`MutexKv`]
//! - Nothing here retries; retries belong to the HTTP client's policy

pub mod config;
pub mod context;
pub mod error;
pub mod meta;
pub mod mutex_kv;
pub mod resolver;

pub use config::{Header, ProviderConfig};
pub use context::{DecodedContext, InstanceState, OperationContext, ResourceData};
pub use error::ProviderError;
pub use meta::ProviderMeta;
pub use mutex_kv::MutexKv;
pub use resolver::get_client;
