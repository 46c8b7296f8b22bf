//! Core data model shared by stores, providers and the resolution engine.

pub mod contents;
pub mod context;
pub mod credential;
pub mod domain;
pub mod error;
pub mod scope;
mod validate;

pub use contents::{DomainEntry, StoreContents};
pub use context::{Context, ContextKind, ContextNode, ancestry};
pub use credential::{Credential, CredentialId, SecretRef};
pub use domain::{Domain, Requirement, Specification};
pub use error::{Error, Result};
pub use scope::CredentialScope;
