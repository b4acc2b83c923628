//! Credential bootstrap: token discovery, generic login and child tokens.

use crate::vault::{VaultClient, VaultError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File the Vault CLI token helper writes to, relative to the home directory.
pub const TOKEN_HELPER_FILE: &str = ".vault-token";

/// Default lifetime of the child token, in seconds.
pub const DEFAULT_MAX_LEASE_TTL_SECONDS: u64 = 1200;

/// Default display name for the child token.
pub const DEFAULT_TOKEN_NAME: &str = "terraform";

/// Generic login against any auth method mount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthLogin {
    /// Login path, e.g. `auth/approle/login`.
    pub path: String,
    /// Namespace to log in from, relative to the root namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Options for the child token the provider works with.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildTokenOptions {
    pub ttl_seconds: u64,
    pub display_name: String,
}

impl Default for ChildTokenOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_MAX_LEASE_TTL_SECONDS,
            display_name: DEFAULT_TOKEN_NAME.to_string(),
        }
    }
}

/// Default location of the token helper file.
pub fn default_token_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(TOKEN_HELPER_FILE))
}

/// Reads a token from the token helper file. A missing file yields `None`.
pub async fn read_token_file(path: &Path) -> std::io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let token = contents.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn client_token(resp: Option<Value>, path: &str) -> Result<String, VaultError> {
    resp.as_ref()
        .and_then(|r| r.get("auth"))
        .and_then(|a| a.get("client_token"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| VaultError::ParseError(format!("no client token returned by {}", path)))
}

/// Logs in through `login` and returns the issued client token.
pub async fn login(client: &VaultClient, login: &AuthLogin) -> Result<String, VaultError> {
    let login_client;
    let client = match login.namespace.as_deref().map(|ns| ns.trim_matches('/')) {
        Some(ns) if !ns.is_empty() => {
            let full = match client.namespace() {
                Some(root) => format!("{}/{}", root, ns),
                None => ns.to_string(),
            };
            login_client = client.with_namespace(&full)?;
            &login_client
        }
        _ => client,
    };

    info!("Logging in to Vault via {}", login.path);
    let resp = client
        .write(&login.path, Value::Object(login.parameters.clone()))
        .await?;
    client_token(resp, &login.path)
}

/// Creates a short-lived child token of the current token.
pub async fn create_child_token(
    client: &VaultClient,
    opts: &ChildTokenOptions,
) -> Result<String, VaultError> {
    let ttl = format!("{}s", opts.ttl_seconds);
    debug!("Creating child token with ttl {}", ttl);
    let resp = client
        .write(
            "auth/token/create",
            json!({
                "display_name": opts.display_name,
                "ttl": ttl,
                "explicit_max_ttl": ttl,
            }),
        )
        .await?;
    client_token(resp, "auth/token/create")
}

/// Returns the namespace the current token was issued in, if any.
pub async fn token_namespace(client: &VaultClient) -> Result<Option<String>, VaultError> {
    let resp = client.read("auth/token/lookup-self").await?;
    Ok(resp
        .as_ref()
        .and_then(|r| crate::vault::common::data_str(r, "namespace_path"))
        .map(|ns| ns.trim_matches('/').to_string())
        .filter(|ns| !ns.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_login_in_nested_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .and(header("x-vault-namespace", "corp/teamA"))
            .and(body_json(json!({"role_id": "r", "secret_id": "s"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"auth": {"client_token": "s.login"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let root = VaultClient::new(&server.uri(), "")
            .unwrap()
            .with_namespace("corp")
            .unwrap();
        let mut parameters = Map::new();
        parameters.insert("role_id".into(), json!("r"));
        parameters.insert("secret_id".into(), json!("s"));
        let token = login(
            &root,
            &AuthLogin {
                path: "auth/approle/login".into(),
                namespace: Some("/teamA/".into()),
                parameters,
            },
        )
        .await
        .unwrap();
        assert_eq!(token, "s.login");
    }

    #[tokio::test]
    async fn test_login_without_token_in_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/userpass/login/bob"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": null})))
            .mount(&server)
            .await;

        let client = VaultClient::new(&server.uri(), "").unwrap();
        let err = login(
            &client,
            &AuthLogin {
                path: "auth/userpass/login/bob".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VaultError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_child_token_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/token/create"))
            .and(header("x-vault-token", "root"))
            .and(body_json(json!({
                "display_name": "terraform",
                "ttl": "1200s",
                "explicit_max_ttl": "1200s"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"auth": {"client_token": "s.child"}})),
            )
            .mount(&server)
            .await;

        let client = VaultClient::new(&server.uri(), "root").unwrap();
        let token = create_child_token(&client, &ChildTokenOptions::default())
            .await
            .unwrap();
        assert_eq!(token, "s.child");
    }

    #[tokio::test]
    async fn test_token_namespace_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/auth/token/lookup-self"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"namespace_path": "corp/"}})),
            )
            .mount(&server)
            .await;

        let client = VaultClient::new(&server.uri(), "root").unwrap();
        assert_eq!(
            token_namespace(&client).await.unwrap().as_deref(),
            Some("corp")
        );
    }

    #[tokio::test]
    async fn test_read_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(TOKEN_HELPER_FILE);
        assert_eq!(read_token_file(&file).await.unwrap(), None);

        std::fs::write(&file, "s.fromfile\n").unwrap();
        assert_eq!(
            read_token_file(&file).await.unwrap().as_deref(),
            Some("s.fromfile")
        );
    }
}
