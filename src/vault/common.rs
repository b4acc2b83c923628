//! Common helper functions for Vault responses.

use crate::vault::VaultError;
use reqwest::{Response, StatusCode};
use serde_json::Value;

/// Checks the HTTP response from Vault. If successful, returns the JSON body
/// (`None` for an empty body); otherwise, it extracts Vault's first error
/// message or falls back to the raw body.
pub async fn check_response(resp: Response) -> Result<Option<Value>, VaultError> {
    let status = resp.status();
    if status.is_success() {
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        return serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| VaultError::ParseError(format!("Failed to parse response: {}", e)));
    }

    let body = resp.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), body))
}

/// Builds an error from a failed response body, preferring the `errors` array.
pub fn error_from_body(status: u16, body: String) -> VaultError {
    if let Ok(val) = serde_json::from_str::<Value>(&body) {
        if let Some(msg) = val
            .get("errors")
            .and_then(|v| v.as_array())
            .and_then(|errors| errors.first())
            .and_then(|v| v.as_str())
        {
            return VaultError::Api {
                status,
                message: msg.to_string(),
            };
        }
    }
    VaultError::HttpStatus(status, body)
}

/// Returns the `data` object of a Vault response, if present.
pub fn response_data(resp: &Value) -> Option<&serde_json::Map<String, Value>> {
    resp.get("data").and_then(|d| d.as_object())
}

/// Returns a string field from the `data` object of a Vault response.
pub fn data_str<'a>(resp: &'a Value, field: &str) -> Option<&'a str> {
    response_data(resp)
        .and_then(|d| d.get(field))
        .and_then(|v| v.as_str())
}
