//! `vault_namespace`: Enterprise namespaces, optionally nested under the
//! namespace named by the `namespace` attribute.

use crate::interface::{Capabilities, ProviderContext};
use crate::provider::{get_client, ProviderError, ResourceData};
use crate::resources::Resource;
use crate::vault::common::response_data;
use crate::vault::version::VAULT_VERSION_112;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

pub const FIELD_PATH: &str = "path";
pub const FIELD_NAMESPACE_ID: &str = "namespace_id";
pub const FIELD_PATH_FQ: &str = "path_fq";
pub const FIELD_CUSTOM_METADATA: &str = "custom_metadata";

pub struct NamespaceResource;

fn ns_path(path: &str) -> String {
    format!("sys/namespaces/{}", path.trim_matches('/'))
}

fn require_enterprise(meta: &dyn ProviderContext) -> Result<(), ProviderError> {
    // Only refuse when the server is known to be community edition.
    if meta.server_info().is_some() && !meta.is_enterprise_supported() {
        return Err(ProviderError::EnterpriseRequired("namespaces"));
    }
    Ok(())
}

fn custom_metadata(d: &ResourceData, meta: &dyn ProviderContext) -> Option<Value> {
    let custom = d.get(FIELD_CUSTOM_METADATA)?;
    if meta.is_api_supported(&VAULT_VERSION_112) {
        Some(custom.clone())
    } else {
        warn!("custom_metadata on namespaces requires Vault 1.12 or later, not sending it");
        None
    }
}

/// Merge patch turning `current` into `desired`: keys no longer wanted are
/// set to null so Vault drops them.
fn metadata_patch(desired: Option<&Value>, current: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = desired
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for key in current.keys() {
        if !patch.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    patch
}

#[async_trait]
impl Resource for NamespaceResource {
    fn name(&self) -> &'static str {
        "vault_namespace"
    }

    async fn create(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        require_enterprise(meta)?;
        let path = d
            .get_str(FIELD_PATH)
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .ok_or(ProviderError::MissingAttribute(FIELD_PATH))?
            .to_string();
        let client = get_client((&*d).into(), meta)?;

        let mut body = json!({});
        if let Some(custom) = custom_metadata(d, meta) {
            body[FIELD_CUSTOM_METADATA] = custom;
        }
        client.write(&ns_path(&path), body).await?;

        debug!("Created namespace {:?} under {:?}", path, client.namespace());
        d.set_id(path);
        self.read(d, meta).await
    }

    async fn read(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        let client = get_client((&*d).into(), meta)?;
        let resp = client.read(&ns_path(d.id())).await?;
        let Some(data) = resp.as_ref().and_then(response_data) else {
            warn!("Namespace {} not found, removing from state", d.id());
            d.set_id("");
            return Ok(());
        };

        let id = d.id().to_string();
        d.set(FIELD_PATH, id.clone());
        if let Some(ns_id) = data.get("id") {
            d.set(FIELD_NAMESPACE_ID, ns_id.clone());
        }
        let path_fq = data
            .get("path")
            .and_then(|p| p.as_str())
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or(id);
        d.set(FIELD_PATH_FQ, path_fq);
        if meta.is_api_supported(&VAULT_VERSION_112) {
            if let Some(custom) = data.get(FIELD_CUSTOM_METADATA) {
                d.set(FIELD_CUSTOM_METADATA, custom.clone());
            }
        }
        Ok(())
    }

    async fn update(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        // Only the custom metadata of a namespace is mutable.
        if !meta.is_api_supported(&VAULT_VERSION_112) {
            if d.get(FIELD_CUSTOM_METADATA).is_some() {
                warn!("custom_metadata on namespaces requires Vault 1.12 or later, not sending it");
            }
            return self.read(d, meta).await;
        }

        let client = get_client((&*d).into(), meta)?;
        let path = ns_path(d.id());
        let current = client
            .read(&path)
            .await?
            .as_ref()
            .and_then(response_data)
            .and_then(|data| data.get(FIELD_CUSTOM_METADATA))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let patch = metadata_patch(d.get(FIELD_CUSTOM_METADATA), &current);
        client
            .patch(&path, json!({ FIELD_CUSTOM_METADATA: patch }))
            .await?;
        self.read(d, meta).await
    }

    async fn delete(
        &self,
        d: &mut ResourceData,
        meta: &dyn ProviderContext,
    ) -> Result<(), ProviderError> {
        let client = get_client((&*d).into(), meta)?;
        client.delete(&ns_path(d.id())).await?;
        Ok(())
    }
}
