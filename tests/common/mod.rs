//! Shared fixtures for the integration tests.
//!
//! `mock_meta` builds a provider around a wiremock server; `VaultFixture`
//! starts a real dev-mode Vault through testcontainers for the ignored
//! end-to-end tests.

use std::sync::Arc;

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use vault_provider::provider::ProviderConfig;
use vault_provider::{ProviderMeta, VaultClient};

/// Set up logging for tests
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer() // This ensures output goes to both stdout and test output
        .try_init();
}

/// Provider metadata whose root client talks to `uri` in `root_namespace`.
#[allow(dead_code)]
pub fn mock_meta(uri: &str, root_namespace: &str) -> Arc<ProviderMeta> {
    let mut client = VaultClient::new(uri, "root").unwrap();
    client.set_namespace(root_namespace).unwrap();
    let mut config = ProviderConfig::with_address(uri);
    config.namespace = Some(root_namespace.to_string()).filter(|ns| !ns.is_empty());
    Arc::new(ProviderMeta::new(client, config))
}

/// A dev-mode Vault container with root token `root`.
#[allow(dead_code)]
pub struct VaultFixture {
    _container: ContainerAsync<GenericImage>,
    port: u16,
}

#[allow(dead_code)]
impl VaultFixture {
    pub async fn new() -> Self {
        let container = GenericImage::new("hashicorp/vault", "1.18.4")
            .with_exposed_port(8200.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Vault server started!"))
            .with_env_var("VAULT_DEV_ROOT_TOKEN_ID", "root")
            .with_env_var("VAULT_DEV_LISTEN_ADDRESS", "0.0.0.0:8200")
            .with_cmd(vec!["server", "-dev", "-dev-root-token-id=root"])
            .start()
            .await
            .unwrap();

        let port = container.get_host_port_ipv4(8200).await.unwrap();
        VaultFixture {
            _container: container,
            port,
        }
    }

    pub fn vault_addr(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}
