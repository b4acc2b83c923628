//! Provider configuration.
//!
//! The same structure is deserialized from a provider block and parsed from
//! the command line, where every option also falls back to the environment
//! variable the Vault CLI uses for it.

use crate::provider::ProviderError;
use crate::vault::auth::{AuthLogin, DEFAULT_MAX_LEASE_TTL_SECONDS};
use crate::vault::VaultVersion;
use clap::builder::BoolishValueParser;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// A custom header sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl FromStr for Header {
    type Err = String;

    /// Parses `name=value`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => Ok(Self {
                name: name.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("header {:?} is not of the form name=value", s)),
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, PartialEq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Vault server address, e.g. "https://vault.example.com:8200".
    #[arg(long, env = "VAULT_ADDR")]
    pub address: Option<String>,

    /// Token to authenticate with.
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Token helper file consulted when no token is given (default: ~/.vault-token).
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Display name of the child token.
    #[arg(long, env = "VAULT_TOKEN_NAME")]
    pub token_name: Option<String>,

    /// Root namespace every request is relative to.
    #[arg(long, env = "VAULT_NAMESPACE")]
    pub namespace: Option<String>,

    /// Adopt the namespace of the token when no namespace is configured.
    #[arg(long)]
    pub set_namespace_from_token: bool,

    /// Extra headers, as name=value.
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<Header>,

    /// Retries for requests failing with 429 or 5xx.
    #[arg(long, env = "VAULT_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    #[arg(long, env = "VAULT_CACERT")]
    pub ca_cert_file: Option<PathBuf>,

    #[arg(long, env = "VAULT_CAPATH")]
    pub ca_cert_dir: Option<PathBuf>,

    #[arg(long, env = "VAULT_CLIENT_CERT", requires = "client_key_file")]
    pub client_cert_file: Option<PathBuf>,

    #[arg(long, env = "VAULT_CLIENT_KEY", requires = "client_cert_file")]
    pub client_key_file: Option<PathBuf>,

    #[arg(long, env = "VAULT_SKIP_VERIFY", value_parser = BoolishValueParser::new())]
    pub skip_tls_verify: bool,

    /// Use the configured token directly instead of a child token.
    #[arg(
        long,
        env = "TERRAFORM_VAULT_SKIP_CHILD_TOKEN",
        value_parser = BoolishValueParser::new()
    )]
    pub skip_child_token: bool,

    /// Lifetime of the child token, in seconds.
    #[arg(long, default_value_t = DEFAULT_MAX_LEASE_TTL_SECONDS)]
    pub max_lease_ttl_seconds: u64,

    /// Do not query the server version at configure time.
    #[arg(long)]
    pub skip_get_vault_version: bool,

    /// Assume this server version instead of querying it.
    #[arg(long)]
    pub vault_version_override: Option<String>,

    /// Namespace used for objects whose state names none (imports).
    #[arg(long, env = "TERRAFORM_VAULT_NAMESPACE_IMPORT")]
    pub import_namespace: Option<String>,

    #[arg(skip)]
    pub auth_login: Option<AuthLogin>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            address: None,
            token: None,
            token_file: None,
            token_name: None,
            namespace: None,
            set_namespace_from_token: false,
            headers: Vec::new(),
            max_retries: 2,
            ca_cert_file: None,
            ca_cert_dir: None,
            client_cert_file: None,
            client_key_file: None,
            skip_tls_verify: false,
            skip_child_token: false,
            max_lease_ttl_seconds: DEFAULT_MAX_LEASE_TTL_SECONDS,
            skip_get_vault_version: false,
            vault_version_override: None,
            import_namespace: None,
            auth_login: None,
        }
    }
}

impl ProviderConfig {
    /// Configuration pointing at `address`, everything else defaulted.
    pub fn with_address(address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            ..Default::default()
        }
    }

    /// The root namespace, trimmed of slashes. Empty means the root of Vault.
    pub fn root_namespace(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .map(|ns| ns.trim_matches('/'))
            .filter(|ns| !ns.is_empty())
    }

    /// Checks the options that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ProviderError> {
        match self.address.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ProviderError::Config(
                    "no Vault address configured (set address or VAULT_ADDR)".to_string(),
                ))
            }
            Some(addr) if !addr.starts_with("http://") && !addr.starts_with("https://") => {
                return Err(ProviderError::Config(format!(
                    "address {:?} must start with http:// or https://",
                    addr
                )))
            }
            Some(_) => {}
        }

        if self.client_cert_file.is_some() != self.client_key_file.is_some() {
            return Err(ProviderError::Config(
                "client_cert_file and client_key_file must be set together".to_string(),
            ));
        }

        if let Some(ver) = &self.vault_version_override {
            ver.parse::<VaultVersion>().map_err(|e| {
                ProviderError::Config(format!("invalid vault_version_override: {}", e))
            })?;
        }

        if let Some(login) = &self.auth_login {
            if login.path.trim_matches('/').is_empty() {
                return Err(ProviderError::Config("auth_login.path is empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use serial_test::serial;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ProviderConfig,
    }

    #[test]
    fn test_deserialize_provider_block() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "address": "https://vault.example.com:8200",
            "namespace": "/corp/",
            "headers": [{"name": "X-Team", "value": "infra"}],
            "auth_login": {
                "path": "auth/approle/login",
                "parameters": {"role_id": "r", "secret_id": "s"}
            }
        }))
        .unwrap();

        assert_eq!(config.root_namespace(), Some("corp"));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.headers[0].name, "X-Team");
        assert_eq!(config.auth_login.unwrap().parameters.len(), 2);
    }

    #[test]
    fn test_header_parsing() {
        let h: Header = "X-Team=infra=ops".parse().unwrap();
        assert_eq!(h.name, "X-Team");
        assert_eq!(h.value, "infra=ops");
        assert!("no-separator".parse::<Header>().is_err());
        assert!("=value".parse::<Header>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            ProviderConfig::default().validate(),
            Err(ProviderError::Config(_))
        ));
        assert!(ProviderConfig::with_address("vault:8200").validate().is_err());
        assert!(ProviderConfig::with_address("http://127.0.0.1:8200")
            .validate()
            .is_ok());

        let config = ProviderConfig {
            vault_version_override: Some("latest".into()),
            ..ProviderConfig::with_address("http://127.0.0.1:8200")
        };
        assert!(config.validate().is_err());

        let config = ProviderConfig {
            client_cert_file: Some("cert.pem".into()),
            ..ProviderConfig::with_address("http://127.0.0.1:8200")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_cli_falls_back_to_environment() {
        std::env::set_var("VAULT_ADDR", "http://10.0.0.1:8200");
        std::env::set_var("VAULT_NAMESPACE", "corp");
        std::env::set_var("TERRAFORM_VAULT_SKIP_CHILD_TOKEN", "true");

        let cli = TestCli::parse_from(["vault-provider", "--header", "X-Team=infra"]);

        std::env::remove_var("VAULT_ADDR");
        std::env::remove_var("VAULT_NAMESPACE");
        std::env::remove_var("TERRAFORM_VAULT_SKIP_CHILD_TOKEN");

        assert_eq!(cli.config.address.as_deref(), Some("http://10.0.0.1:8200"));
        assert_eq!(cli.config.root_namespace(), Some("corp"));
        assert!(cli.config.skip_child_token);
        assert_eq!(cli.config.headers.len(), 1);
        assert_eq!(cli.config.max_retries, 2);
    }

    #[test]
    #[serial]
    fn test_skip_flags_accept_numeric_environment_values() {
        std::env::set_var("VAULT_SKIP_VERIFY", "1");
        std::env::set_var("TERRAFORM_VAULT_SKIP_CHILD_TOKEN", "0");

        let cli = TestCli::try_parse_from(["vault-provider"]);

        std::env::remove_var("VAULT_SKIP_VERIFY");
        std::env::remove_var("TERRAFORM_VAULT_SKIP_CHILD_TOKEN");

        let cli = cli.unwrap();
        assert!(cli.config.skip_tls_verify);
        assert!(!cli.config.skip_child_token);

        let cli = TestCli::parse_from(["vault-provider", "--skip-tls-verify"]);
        assert!(cli.config.skip_tls_verify);
    }
}
