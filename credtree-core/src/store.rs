//! Per-context credential stores.

use crate::errors::{CoreError, CoreResult};
use credtree_spec::{
    Context, ContextKind, Credential, CredentialScope, Domain, StoreContents,
};
use std::sync::{Arc, RwLock};

pub mod file;

/// An ordered collection of domain→credential mappings scoped to one context.
///
/// Reads are concurrent; mutation is serialized per store, and unrelated
/// stores never contend. Stores that do not support mutation inherit the
/// default method bodies and report [`CoreError::ReadOnly`].
pub trait CredentialsStore: Send + Sync {
    /// Stable identifier, used in diagnostics and permission errors.
    fn store_id(&self) -> String;

    /// The context this store is attached to.
    fn context(&self) -> Arc<dyn Context>;

    /// Identifier of the provider that produced this store.
    fn provider_id(&self) -> &str;

    /// Scope tiers credentials in this store may carry: the intersection of
    /// what the provider declares and what is valid at the store's context.
    fn supported_scopes(&self) -> Vec<CredentialScope>;

    fn domains(&self) -> Vec<Domain>;

    fn credentials(&self, domain: &Domain) -> Vec<Credential>;

    /// Point-in-time snapshot of the whole domain→credentials map.
    fn contents(&self) -> StoreContents;

    fn writable(&self) -> bool {
        false
    }

    fn add(&self, _domain: &Domain, _credential: Credential) -> CoreResult<()> {
        Err(CoreError::ReadOnly {
            store: self.store_id(),
        })
    }

    fn update(&self, _domain: &Domain, _credential: Credential) -> CoreResult<()> {
        Err(CoreError::ReadOnly {
            store: self.store_id(),
        })
    }

    fn remove(&self, _domain: &Domain, _id: &str) -> CoreResult<()> {
        Err(CoreError::ReadOnly {
            store: self.store_id(),
        })
    }

    /// Swaps the whole map in one step; used by configuration application.
    fn replace_contents(&self, _contents: StoreContents) -> CoreResult<()> {
        Err(CoreError::ReadOnly {
            store: self.store_id(),
        })
    }
}

/// Computes the scopes a store at `kind` may serve given what its provider declares.
pub(crate) fn effective_scopes(
    declared: &[CredentialScope],
    kind: &ContextKind,
) -> Vec<CredentialScope> {
    CredentialScope::contextually_valid(kind)
        .iter()
        .copied()
        .filter(|scope| declared.contains(scope))
        .collect()
}

/// In-memory store.
pub struct MemoryStore {
    provider_id: String,
    context: Arc<dyn Context>,
    scopes: Vec<CredentialScope>,
    contents: RwLock<StoreContents>,
}

impl MemoryStore {
    pub fn new(
        provider_id: impl Into<String>,
        context: Arc<dyn Context>,
        declared_scopes: &[CredentialScope],
    ) -> Self {
        let scopes = effective_scopes(declared_scopes, context.kind());
        Self {
            provider_id: provider_id.into(),
            context,
            scopes,
            contents: RwLock::new(StoreContents::new()),
        }
    }
}

impl CredentialsStore for MemoryStore {
    fn store_id(&self) -> String {
        format!("{}@{}", self.provider_id, self.context.context_id())
    }

    fn context(&self) -> Arc<dyn Context> {
        Arc::clone(&self.context)
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn supported_scopes(&self) -> Vec<CredentialScope> {
        self.scopes.clone()
    }

    fn domains(&self) -> Vec<Domain> {
        self.contents.read().unwrap().domains()
    }

    fn credentials(&self, domain: &Domain) -> Vec<Credential> {
        self.contents
            .read()
            .unwrap()
            .credentials(domain.name())
            .to_vec()
    }

    fn contents(&self) -> StoreContents {
        self.contents.read().unwrap().clone()
    }

    fn writable(&self) -> bool {
        true
    }

    fn add(&self, domain: &Domain, credential: Credential) -> CoreResult<()> {
        let mut contents = self.contents.write().unwrap();
        contents.add_credential(domain, credential)?;
        Ok(())
    }

    fn update(&self, domain: &Domain, credential: Credential) -> CoreResult<()> {
        let mut contents = self.contents.write().unwrap();
        contents.update_credential(domain.name(), credential)?;
        Ok(())
    }

    fn remove(&self, domain: &Domain, id: &str) -> CoreResult<()> {
        let mut contents = self.contents.write().unwrap();
        contents.remove_credential(domain.name(), id)?;
        Ok(())
    }

    fn replace_contents(&self, next: StoreContents) -> CoreResult<()> {
        let mut contents = self.contents.write().unwrap();
        *contents = next;
        Ok(())
    }
}
