use crate::provider::{MutexKv, ProviderError};
use crate::vault::{ServerInfo, VaultClient, VaultVersion};
use std::sync::Arc;

/// Resolves the API client a handler must use.
///
/// Handlers depend on this rather than on [`ProviderMeta`](crate::provider::ProviderMeta)
/// so that tests can substitute their own resolver.
pub trait ClientResolver: Send + Sync {
    /// The client bound to the provider's root namespace.
    fn root_client(&self) -> Result<Arc<VaultClient>, ProviderError>;

    /// A client bound to `namespace`, relative to the root namespace.
    fn namespaced_client(&self, namespace: &str) -> Result<Arc<VaultClient>, ProviderError>;

    /// Namespace to fall back to when an operation names none.
    fn import_namespace(&self) -> Option<&str> {
        None
    }
}

/// Read-only view of what the connected server supports.
pub trait Capabilities {
    fn server_info(&self) -> Option<&ServerInfo>;

    fn vault_version(&self) -> Option<&VaultVersion> {
        self.server_info().map(|info| &info.version)
    }

    /// True when the server is at least `min`. Unknown versions support nothing.
    fn is_api_supported(&self, min: &VaultVersion) -> bool {
        self.server_info()
            .map(|info| info.version >= *min)
            .unwrap_or(false)
    }

    fn is_enterprise_supported(&self) -> bool {
        self.server_info()
            .map(|info| info.enterprise)
            .unwrap_or(false)
    }
}

/// Everything a resource handler needs from the provider: client
/// resolution, server capabilities and the shared mutex table.
pub trait ProviderContext: ClientResolver + Capabilities {
    fn mutex_kv(&self) -> &MutexKv;
}
