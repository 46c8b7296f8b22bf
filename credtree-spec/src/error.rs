use thiserror::Error;

/// Result alias for data-model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Canonical error surface for the credential data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("credential identifier is reserved or empty: {value}")]
    InvalidIdentifier { value: String },
    #[error("{field} contains invalid characters: {value}")]
    InvalidCharacters { field: &'static str, value: String },
    #[error("{field} must not be empty")]
    EmptyComponent { field: &'static str },
    #[error("invalid {0}: {1}")]
    Invalid(String, String),
    #[error("domain `{name}` already present in store contents")]
    DuplicateDomain { name: String },
    #[error("credential `{id}` already present in domain")]
    DuplicateCredential { id: String },
    #[error("{entity} not found")]
    NotFound { entity: String },
}
