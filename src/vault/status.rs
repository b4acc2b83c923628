//! Helpers for checking Vault status and edition

use crate::vault::version::VaultVersion;
use crate::vault::{VaultClient, VaultError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Detailed status information returned from Vault's seal-status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStatus {
    #[serde(rename = "type", default)]
    pub type_field: String,
    pub initialized: bool,
    pub sealed: bool,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub standby: bool,
}

/// Version and edition of the Vault server a provider is talking to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: VaultVersion,
    pub enterprise: bool,
}

impl ServerInfo {
    /// Builds the snapshot from a raw version string such as `1.15.2+ent`.
    pub fn from_version_string(raw: &str) -> Result<Self, VaultError> {
        Ok(Self {
            version: raw.parse()?,
            enterprise: raw.contains("+ent"),
        })
    }
}

/// Gets the seal status of the Vault server `client` points at.
pub async fn seal_status(client: &VaultClient) -> Result<VaultStatus, VaultError> {
    debug!("Requesting Vault status from {}", client.address());
    let resp = client.read("sys/seal-status").await?.ok_or_else(|| {
        VaultError::ParseError("empty response from sys/seal-status".to_string())
    })?;
    let status: VaultStatus = serde_json::from_value(resp)?;

    debug!(
        "Vault status: initialized={}, sealed={}, standby={}, version={}",
        status.initialized, status.sealed, status.standby, status.version
    );
    Ok(status)
}

/// Fetches the server version and edition.
pub async fn server_info(client: &VaultClient) -> Result<ServerInfo, VaultError> {
    let status = seal_status(client).await?;
    let info = ServerInfo::from_version_string(&status.version)?;
    info!(
        "Vault server at {} is version {} ({})",
        client.address(),
        info.version,
        if info.enterprise { "enterprise" } else { "community" }
    );
    Ok(info)
}
