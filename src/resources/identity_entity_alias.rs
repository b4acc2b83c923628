//! `vault_identity_entity_alias`: aliases binding an entity to an auth mount.
//!
//! Vault allows a single alias per (name, mount accessor) pair. Creation is
//! therefore a lookup followed by a write, and both run under a named lock
//! keyed by the mount accessor so that concurrent creates against the same
//! mount cannot both see "no alias yet".

use crate::interface::{Capabilities, ProviderContext};
use crate::provider::{get_client, ProviderError, ResourceData};
use crate::resources::Resource;
use crate::vault::common::{data_str, response_data};
use crate::vault::version::VAULT_VERSION_19;
use crate::vault::VaultError;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const ENTITY_ALIAS_PATH: &str = "identity/entity-alias";
const LOOKUP_PATH: &str = "identity/lookup/entity-alias";

pub const FIELD_NAME: &str = "name";
pub const FIELD_MOUNT_ACCESSOR: &str = "mount_accessor";
pub const FIELD_CANONICAL_ID: &str = "canonical_id";
pub const FIELD_CUSTOM_METADATA: &str = "custom_metadata";

pub struct EntityAliasResource;

/// Lock key shared by every alias operation on one auth mount.
pub fn mutex_key(mount_accessor: &str) -> String {
    format!("{}/{}", ENTITY_ALIAS_PATH, mount_accessor)
}

fn required<'a>(d: &'a ResourceData, field: &'static str) -> Result<&'a str, ProviderError> {
    d.get_str(field).ok_or(ProviderError::MissingAttribute(field))
}

fn alias_body(d: &ResourceData, meta: &dyn ProviderContext) -> Result<Value, ProviderError> {
    let mut body = json!({
        FIELD_NAME: required(d, FIELD_NAME)?,
        FIELD_MOUNT_ACCESSOR: required(d, FIELD_MOUNT_ACCESSOR)?,
        FIELD_CANONICAL_ID: required(d, FIELD_CANONICAL_ID)?,
    });
    if let Some(custom) = d.get(FIELD_CUSTOM_METADATA) {
        if meta.is_api_supported(&VAULT_VERSION_19) {
            body[FIELD_CUSTOM_METADATA] = custom.clone();
        } else {
            warn!("custom_metadata requires Vault 1.9 or later, not sending it");
        }
    }
    Ok(body)
}

fn id_path(id: &str) -> String {
    format!("{}/id/{}", ENTITY_ALIAS_PATH, id)
}

#[async_trait]
impl Resource for EntityAliasResource {
    fn name(&self) -> &'static str {
        "vault_identity_entity_alias"
    }

    async fn create(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        let client = get_client((&*d).into(), meta)?;
        let body = alias_body(d, meta)?;
        let name = required(d, FIELD_NAME)?.to_string();
        let accessor = required(d, FIELD_MOUNT_ACCESSOR)?.to_string();

        let key = mutex_key(&accessor);
        let kv = meta.mutex_kv();
        let id = {
            kv.lock(&key).await;
            let _unlock = scopeguard::guard((), |_| kv.unlock(&key));

            let existing = client
                .write(
                    LOOKUP_PATH,
                    json!({ FIELD_NAME: name, FIELD_MOUNT_ACCESSOR: accessor }),
                )
                .await?;
            if let Some(existing_id) = existing.as_ref().and_then(|r| data_str(r, "id")) {
                debug!("Entity alias {:?} already exists as {}", name, existing_id);
                return Err(ProviderError::AlreadyExists {
                    kind: "entity alias",
                    name: format!("{} (mount accessor {})", name, accessor),
                });
            }

            let resp = client.write(ENTITY_ALIAS_PATH, body).await?;
            resp.as_ref()
                .and_then(|r| data_str(r, "id"))
                .map(str::to_string)
                .ok_or_else(|| {
                    VaultError::ParseError("no id returned for new entity alias".to_string())
                })?
        };

        debug!("Created entity alias {:?} with id {}", name, id);
        d.set_id(id);
        self.read(d, meta).await
    }

    async fn read(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        let client = get_client((&*d).into(), meta)?;
        let resp = client.read(&id_path(d.id())).await?;
        let Some(data) = resp.as_ref().and_then(response_data) else {
            warn!("Entity alias {} not found, removing from state", d.id());
            d.set_id("");
            return Ok(());
        };

        for field in [FIELD_NAME, FIELD_MOUNT_ACCESSOR, FIELD_CANONICAL_ID] {
            if let Some(v) = data.get(field) {
                d.set(field, v.clone());
            }
        }
        if meta.is_api_supported(&VAULT_VERSION_19) {
            if let Some(v) = data.get(FIELD_CUSTOM_METADATA) {
                d.set(FIELD_CUSTOM_METADATA, v.clone());
            }
        }
        Ok(())
    }

    async fn update(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        let client = get_client((&*d).into(), meta)?;
        let body = alias_body(d, meta)?;
        let key = mutex_key(required(d, FIELD_MOUNT_ACCESSOR)?);

        {
            let kv = meta.mutex_kv();
            kv.lock(&key).await;
            let _unlock = scopeguard::guard((), |_| kv.unlock(&key));
            client.write(&id_path(d.id()), body).await?;
        }

        self.read(d, meta).await
    }

    async fn delete(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        let client = get_client((&*d).into(), meta)?;
        let key = mutex_key(required(d, FIELD_MOUNT_ACCESSOR)?);

        let kv = meta.mutex_kv();
        kv.lock(&key).await;
        let _unlock = scopeguard::guard((), |_| kv.unlock(&key));
        client.delete(&id_path(d.id())).await?;
        Ok(())
    }
}
