use thiserror::Error;

/// Result alias for engine operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by stores, providers and the resolution engine.
///
/// Resolution itself never fails for "nothing matched"; an empty result is
/// the normal outcome, and permission-insufficient callers also receive
/// empty results so the presence of hidden credentials is not revealed.
/// Administrative operations are the exception and fail loudly.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Spec(#[from] credtree_spec::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The provider backing a store was deregistered after the store was
    /// created. Fatal for that store only.
    #[error("credentials provider `{provider}` is no longer registered")]
    ProviderMissing { provider: String },
    #[error("store `{store}` does not support mutation")]
    ReadOnly { store: String },
    #[error("permission denied: {action}")]
    PermissionDenied { action: String },
    #[error("vault error: {0}")]
    Vault(String),
    #[error("{0}")]
    Builder(String),
}
