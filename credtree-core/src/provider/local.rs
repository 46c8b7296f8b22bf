//! In-memory provider: one [`MemoryStore`] per explicitly attached context.

use crate::errors::CoreResult;
use crate::provider::CredentialsProvider;
use crate::store::{CredentialsStore, MemoryStore};
use async_trait::async_trait;
use credtree_spec::{Context, ContextKind, CredentialScope};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Provider backed by process memory.
///
/// Contexts must be attached before they contribute stores; an unattached
/// context is simply not applicable for this provider.
pub struct LocalProvider {
    id: String,
    declared: Vec<CredentialScope>,
    kinds: Vec<String>,
    enabled: AtomicBool,
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl std::fmt::Debug for LocalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalProvider")
            .field("id", &self.id)
            .field("declared", &self.declared)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

impl LocalProvider {
    pub fn new(id: impl Into<String>, declared: &[CredentialScope]) -> Self {
        Self {
            id: id.into(),
            declared: declared.to_vec(),
            kinds: Vec::new(),
            enabled: AtomicBool::new(true),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Declares the credential type tags this provider produces.
    pub fn with_credential_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Creates (or returns) the store for `context`.
    pub fn attach(&self, context: &Arc<dyn Context>) -> Arc<MemoryStore> {
        let mut stores = self.stores.write().unwrap();
        Arc::clone(
            stores
                .entry(context.context_id().to_string())
                .or_insert_with(|| {
                    Arc::new(MemoryStore::new(
                        self.id.clone(),
                        Arc::clone(context),
                        &self.declared,
                    ))
                }),
        )
    }
}

#[async_trait]
impl CredentialsProvider for LocalProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn supported_scopes(&self, kind: &ContextKind) -> Vec<CredentialScope> {
        CredentialScope::contextually_valid(kind)
            .iter()
            .copied()
            .filter(|scope| self.declared.contains(scope))
            .collect()
    }

    fn credential_kinds(&self) -> Vec<String> {
        self.kinds.clone()
    }

    async fn stores_for(
        &self,
        context: &Arc<dyn Context>,
    ) -> CoreResult<Vec<Arc<dyn CredentialsStore>>> {
        let stores = self.stores.read().unwrap();
        Ok(stores
            .get(context.context_id())
            .map(|store| vec![Arc::clone(store) as Arc<dyn CredentialsStore>])
            .unwrap_or_default())
    }
}
