//! Provider of per-user private stores.

use crate::errors::CoreResult;
use crate::provider::CredentialsProvider;
use crate::store::{CredentialsStore, MemoryStore};
use async_trait::async_trait;
use credtree_spec::{Context, ContextKind, CredentialScope};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Serves exactly one store per user context and nothing anywhere else.
///
/// User-tier credentials only ever reach a resolution result through this
/// kind of store, and only when the caller opted the acting principal's own
/// context into the walk.
#[derive(Default)]
pub struct UserProvider {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl std::fmt::Debug for UserProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserProvider").finish_non_exhaustive()
    }
}

impl UserProvider {
    pub const ID: &'static str = "users";

    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or returns) the private store for a user context.
    pub fn store_for(&self, context: &Arc<dyn Context>) -> Option<Arc<MemoryStore>> {
        if context.kind() != &ContextKind::User {
            return None;
        }
        let mut stores = self.stores.write().unwrap();
        Some(Arc::clone(
            stores
                .entry(context.context_id().to_string())
                .or_insert_with(|| {
                    Arc::new(MemoryStore::new(
                        Self::ID,
                        Arc::clone(context),
                        &[CredentialScope::User, CredentialScope::Global],
                    ))
                }),
        ))
    }
}

#[async_trait]
impl CredentialsProvider for UserProvider {
    fn provider_id(&self) -> &str {
        Self::ID
    }

    fn display_name(&self) -> &str {
        "per-user credentials"
    }

    fn supported_scopes(&self, kind: &ContextKind) -> Vec<CredentialScope> {
        match kind {
            ContextKind::User => vec![CredentialScope::User, CredentialScope::Global],
            _ => Vec::new(),
        }
    }

    async fn stores_for(
        &self,
        context: &Arc<dyn Context>,
    ) -> CoreResult<Vec<Arc<dyn CredentialsStore>>> {
        Ok(self
            .store_for(context)
            .map(|store| vec![store as Arc<dyn CredentialsStore>])
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credtree_spec::ContextNode;

    #[tokio::test]
    async fn serves_user_contexts_only() {
        let provider = UserProvider::new();
        let root = ContextNode::root();
        let alice = ContextNode::user("alice");

        assert!(provider.stores_for(&root).await.unwrap().is_empty());
        let stores = provider.stores_for(&alice).await.unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(
            stores[0].supported_scopes(),
            vec![CredentialScope::User, CredentialScope::Global]
        );
    }
}
