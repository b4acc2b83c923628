//! Resource handlers.
//!
//! Each handler maps one Vault API path family onto the create/read/update/
//! delete callbacks the host framework drives. Handlers get their client
//! from [`get_client`](crate::provider::get_client) and must be safe to call
//! concurrently.

use crate::interface::ProviderContext;
use crate::provider::{ProviderError, ResourceData};
use async_trait::async_trait;

pub mod identity_entity_alias;
pub mod namespace;

pub use identity_entity_alias::EntityAliasResource;
pub use namespace::NamespaceResource;

/// Callbacks for one resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name, e.g. `vault_namespace`.
    fn name(&self) -> &'static str;

    async fn create(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError>;

    /// Refreshes `d` from Vault. Clears the id when the object is gone.
    async fn read(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError>;

    async fn update(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError>;

    async fn delete(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError>;
}

static RESOURCES: &[&dyn Resource] = &[&EntityAliasResource, &NamespaceResource];

/// Looks up the handler for a resource type name.
pub fn lookup(name: &str) -> Option<&'static dyn Resource> {
    RESOURCES.iter().copied().find(|r| r.name() == name)
}

/// All registered resource type names.
pub fn names() -> impl Iterator<Item = &'static str> {
    RESOURCES.iter().map(|r| r.name())
}
