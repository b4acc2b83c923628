#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP status {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid Vault version {0:?}")]
    Version(String),

    #[error("Error from reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    /// HTTP status of the failed call, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            VaultError::Api { status, .. } | VaultError::HttpStatus(status, _) => Some(*status),
            VaultError::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
