//! Decision engine for hierarchically scoped credentials: provider-backed
//! stores, scope- and domain-filtered resolution, non-destructive merge of
//! declarative configuration, and per-execution credential bindings.

pub mod binder;
pub mod config;
pub mod errors;
pub mod merge;
pub mod principal;
pub mod provider;
pub mod resolve;
pub mod store;
pub mod usage;
pub mod vault;

pub use binder::{Binding, BindingRegistry, CredentialParameterValue, ExecutionBindings};
pub use config::CredentialsConfig;
pub use errors::{CoreError, CoreResult};
pub use merge::{MergeStrategy, apply, merge};
pub use principal::{AccessGuard, Authorizer, Principal};
pub use provider::file::FileProvider;
pub use provider::local::LocalProvider;
pub use provider::user::UserProvider;
pub use provider::{CredentialsProvider, ProviderRegistry};
pub use resolve::{CredentialMatcher, Resolver, ResolverBuilder, RevealedSecret};
pub use store::file::FileStore;
pub use store::{CredentialsStore, MemoryStore};
pub use usage::UsageTracker;
pub use vault::{MemoryVault, SecretVault};
