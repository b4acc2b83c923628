use crate::vault::VaultError;

/// Errors surfaced by the provider core to resource handlers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider metadata was used before configuration completed.
    #[error("provider not configured: {0} is not set")]
    NotConfigured(&'static str),

    #[error("empty namespace not allowed")]
    EmptyNamespace,

    #[error("client resolution called with unsupported context: {0}")]
    UnsupportedContext(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("{0} requires Vault Enterprise")]
    EnterpriseRequired(&'static str),

    #[error("required attribute {0:?} is not set")]
    MissingAttribute(&'static str),

    #[error("Vault version snapshot already populated")]
    ServerInfoAlreadySet,

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
