//! Client implementation for Vault API interactions.
//!
//! This module provides a client for making HTTP requests to the Vault API
//! with authentication, namespace binding, retries and error handling.
//! Clones made through [`VaultClient::with_namespace`] share the underlying
//! `reqwest::Client`, so transport, TLS settings and the connection pool are
//! common to every namespace-bound client.

use crate::vault::common::check_response;
use crate::vault::VaultError;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the client token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";
/// Header binding a request to a Vault namespace.
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Retry behaviour for requests that fail with a transient error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), doubling and capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.min_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
            || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
    }
}

/// Client for interacting with the Vault HTTP API.
#[derive(Debug, Clone)]
pub struct VaultClient {
    /// Base URL of the Vault server
    addr: String,
    /// Auth token for Vault API requests
    token: String,
    /// Namespace every request is bound to, if any
    namespace: Option<String>,
    /// HTTP client for making requests
    client: Client,
    /// Custom headers to add to requests
    custom_headers: HeaderMap,
    retry: RetryPolicy,
}

impl VaultClient {
    /// Creates a new VaultClient with the specified address and token.
    pub fn new(addr: &str, token: &str) -> Result<Self, VaultError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VaultError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http_client(client, addr, token))
    }

    /// Creates a VaultClient around an already configured HTTP client.
    pub fn with_http_client(client: Client, addr: &str, token: &str) -> Self {
        Self {
            addr: addr.trim_end_matches('/').to_string(),
            token: token.to_string(),
            namespace: None,
            client,
            custom_headers: HeaderMap::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn address(&self) -> &str {
        &self.addr
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn set_retry_policy(&mut self, retry: RetryPolicy) -> &mut Self {
        self.retry = retry;
        self
    }

    /// Adds a custom header to the client.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the header
    /// * `value` - The value of the header
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self, VaultError> {
        let header_name = HeaderName::from_str(name).map_err(|e| VaultError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| VaultError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.custom_headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Binds this client to `namespace`. An empty namespace unbinds it.
    pub fn set_namespace(&mut self, namespace: &str) -> Result<(), VaultError> {
        if namespace.is_empty() {
            self.namespace = None;
            return Ok(());
        }
        HeaderValue::from_str(namespace).map_err(|e| VaultError::InvalidHeader {
            name: NAMESPACE_HEADER.to_string(),
            reason: e.to_string(),
        })?;
        self.namespace = Some(namespace.to_string());
        Ok(())
    }

    /// Clones this client and binds the clone to `namespace`.
    ///
    /// The clone shares transport, token, headers and retry policy with `self`.
    pub fn with_namespace(&self, namespace: &str) -> Result<Self, VaultError> {
        let mut cloned = self.clone();
        cloned.set_namespace(namespace)?;
        Ok(cloned)
    }

    /// Reads `path`. A 404 yields `None`.
    pub async fn read(&self, path: &str) -> Result<Option<Value>, VaultError> {
        self.request_opt(Method::GET, path, None).await
    }

    /// Writes `body` to `path`. An empty (204) response yields `None`; any
    /// non-2xx status, 404 included, is an error.
    pub async fn write(&self, path: &str, body: Value) -> Result<Option<Value>, VaultError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Deletes `path`. Deleting something already gone is not an error.
    pub async fn delete(&self, path: &str) -> Result<(), VaultError> {
        self.request_opt(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Applies a JSON merge patch to `path`.
    pub async fn patch(&self, path: &str, body: Value) -> Result<Option<Value>, VaultError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// Lists keys under `path` using Vault's `LIST` verb. A 404 yields `None`.
    pub async fn list(&self, path: &str) -> Result<Option<Value>, VaultError> {
        let method = Method::from_bytes(b"LIST")
            .map_err(|e| VaultError::Network(format!("Invalid method: {}", e)))?;
        self.request_opt(method, path, None).await
    }

    async fn request_opt(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, VaultError> {
        match self.request(method, path, body).await {
            Ok(value) => Ok(value),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Makes a request to the Vault API with the specified method and optional body,
    /// retrying transient failures according to the retry policy.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, VaultError> {
        let url = format!("{}/v1/{}", self.addr, path.trim_start_matches('/'));
        let mut attempt = 0;

        loop {
            let mut request = self.client.request(method.clone(), &url);

            // Add token header for authentication
            if !self.token.is_empty() {
                request = request.header(TOKEN_HEADER, &self.token);
            }
            if let Some(ns) = &self.namespace {
                request = request.header(NAMESPACE_HEADER, ns);
            }

            // Add any custom headers
            for (name, value) in self.custom_headers.iter() {
                request = request.header(name, value);
            }

            if let Some(json_body) = &body {
                if method == Method::PATCH {
                    request = request.header(CONTENT_TYPE, "application/merge-patch+json");
                }
                request = request.json(json_body);
            }

            debug!(
                "{} {} (namespace: {:?}, attempt {})",
                method,
                url,
                self.namespace,
                attempt + 1
            );
            let outcome = request.send().await;

            let retryable = match &outcome {
                Ok(resp) => RetryPolicy::should_retry(resp.status()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };
            if retryable && attempt < self.retry.max_retries {
                attempt += 1;
                let wait = self.retry.backoff(attempt);
                match &outcome {
                    Ok(resp) => warn!(
                        "{} {} returned {}, retrying in {:?}",
                        method,
                        url,
                        resp.status(),
                        wait
                    ),
                    Err(e) => warn!("{} {} failed: {}, retrying in {:?}", method, url, e, wait),
                }
                tokio::time::sleep(wait).await;
                continue;
            }

            let response =
                outcome.map_err(|e| VaultError::Network(format!("Request failed: {}", e)))?;
            return check_response(response).await;
        }
    }
}
