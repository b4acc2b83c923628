//! Long-lived provider state handed to every handler.

use crate::interface::{Capabilities, ProviderContext};
use crate::provider::{MutexKv, ProviderConfig, ProviderError};
use crate::vault::auth::{self, ChildTokenOptions, DEFAULT_TOKEN_NAME};
use crate::vault::{status, RetryPolicy, ServerInfo, VaultClient};
use once_cell::sync::OnceCell;
use reqwest::{Certificate, Identity};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// Provider metadata: the root client, the configuration it was built
/// from, the namespace client cache, the server version snapshot and the
/// named mutex table.
///
/// A default-constructed value is unconfigured; resolving a client from it
/// fails with [`ProviderError::NotConfigured`].
#[derive(Default)]
pub struct ProviderMeta {
    pub(crate) client: Option<Arc<VaultClient>>,
    pub(crate) config: Option<ProviderConfig>,
    /// Fully-qualified namespace path -> client bound to it. Never evicted.
    pub(crate) client_cache: RwLock<HashMap<String, Arc<VaultClient>>>,
    server_info: OnceCell<ServerInfo>,
    mutex_kv: MutexKv,
}

impl ProviderMeta {
    /// Wraps an already built root client. The version snapshot starts empty.
    pub fn new(client: VaultClient, config: ProviderConfig) -> Self {
        Self {
            client: Some(Arc::new(client)),
            config: Some(config),
            ..Default::default()
        }
    }

    /// Builds the root client from `config`: transport and TLS, credentials,
    /// namespace, then the server version snapshot.
    pub async fn configure(config: ProviderConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        let address = config
            .address
            .as_deref()
            .map(str::trim)
            .ok_or(ProviderError::NotConfigured("address"))?;

        let http = build_http_client(&config)?;
        let mut client = VaultClient::with_http_client(http, address, "");
        client.set_retry_policy(RetryPolicy {
            max_retries: config.max_retries,
            ..Default::default()
        });
        for header in &config.headers {
            client.add_header(&header.name, &header.value)?;
        }
        if let Some(ns) = config.root_namespace() {
            client.set_namespace(ns)?;
        }

        let token = match &config.auth_login {
            Some(login) => auth::login(&client, login).await?,
            None => resolve_token(&config).await?,
        };
        client.set_token(&token);

        if config.set_namespace_from_token && config.root_namespace().is_none() {
            if let Some(ns) = auth::token_namespace(&client).await? {
                info!("Using namespace {:?} from token", ns);
                client.set_namespace(&ns)?;
            }
        }

        if !config.skip_child_token {
            let opts = ChildTokenOptions {
                ttl_seconds: config.max_lease_ttl_seconds,
                display_name: config
                    .token_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string()),
            };
            let child = auth::create_child_token(&client, &opts).await?;
            client.set_token(&child);
        }

        let version_override = config.vault_version_override.clone();
        let skip_version = config.skip_get_vault_version;
        let meta = Self::new(client, config);

        if let Some(raw) = version_override {
            debug!("Using Vault version override {}", raw);
            meta.set_server_info(ServerInfo::from_version_string(&raw)?)?;
        } else if !skip_version {
            let root = meta.root()?;
            let info = status::server_info(&root).await?;
            meta.set_server_info(info)?;
        }

        Ok(meta)
    }

    /// Records the server version snapshot. It can only be set once.
    pub fn set_server_info(&self, info: ServerInfo) -> Result<(), ProviderError> {
        self.server_info
            .set(info)
            .map_err(|_| ProviderError::ServerInfoAlreadySet)
    }

    pub fn config(&self) -> Option<&ProviderConfig> {
        self.config.as_ref()
    }

    /// The named mutex table shared by all handlers of this provider.
    pub fn mutex_kv(&self) -> &MutexKv {
        &self.mutex_kv
    }

    pub(crate) fn root(&self) -> Result<Arc<VaultClient>, ProviderError> {
        self.client
            .clone()
            .ok_or(ProviderError::NotConfigured("client"))
    }
}

impl Capabilities for ProviderMeta {
    fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.get()
    }
}

impl ProviderContext for ProviderMeta {
    fn mutex_kv(&self) -> &MutexKv {
        &self.mutex_kv
    }
}

async fn resolve_token(config: &ProviderConfig) -> Result<String, ProviderError> {
    if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }
    if let Ok(token) = std::env::var("VAULT_TOKEN") {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    let file = config.token_file.clone().or_else(auth::default_token_file);
    if let Some(file) = file {
        if let Some(token) = auth::read_token_file(&file).await? {
            debug!("Using token from {}", file.display());
            return Ok(token);
        }
    }
    Err(ProviderError::Config(
        "no Vault token found (set token, VAULT_TOKEN or use auth_login)".to_string(),
    ))
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>, ProviderError> {
    std::fs::read(path).map_err(|e| {
        ProviderError::Config(format!("cannot read {} {}: {}", what, path.display(), e))
    })
}

fn build_http_client(config: &ProviderConfig) -> Result<reqwest::Client, ProviderError> {
    let tls_err = |e: reqwest::Error| ProviderError::Config(format!("TLS configuration: {}", e));
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(60));

    if let Some(path) = &config.ca_cert_file {
        let pem = read_file(path, "CA certificate")?;
        builder = builder.add_root_certificate(Certificate::from_pem(&pem).map_err(tls_err)?);
    }
    if let Some(dir) = &config.ca_cert_dir {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ProviderError::Config(format!("cannot read CA directory {}: {}", dir.display(), e))
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                let pem = read_file(&path, "CA certificate")?;
                builder =
                    builder.add_root_certificate(Certificate::from_pem(&pem).map_err(tls_err)?);
            }
        }
    }
    if let (Some(cert), Some(key)) = (&config.client_cert_file, &config.client_key_file) {
        let cert = read_file(cert, "client certificate")?;
        let key = read_file(key, "client key")?;
        builder = builder.identity(Identity::from_pkcs8_pem(&cert, &key).map_err(tls_err)?);
    }
    if config.skip_tls_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(tls_err)
}
