//! Provider extension point and the prioritized registry.

use crate::errors::{CoreError, CoreResult};
use crate::store::CredentialsStore;
use async_trait::async_trait;
use credtree_spec::{Context, ContextKind, CredentialScope};
use std::sync::Arc;

pub mod file;
pub mod local;
pub mod user;

/// A registered factory of stores for contexts.
///
/// Implementations are registered explicitly at process startup in a
/// [`ProviderRegistry`]; there is no runtime discovery. A provider may be
/// backed by a remote service; [`CredentialsProvider::stores_for`] is async
/// so the engine can bound each call independently.
#[async_trait]
pub trait CredentialsProvider: std::fmt::Debug + Send + Sync {
    /// Stable identifier recorded on every store this provider produces.
    fn provider_id(&self) -> &str;

    fn display_name(&self) -> &str {
        self.provider_id()
    }

    /// Disabled providers are skipped entirely: no stores, and no
    /// contribution to scope or credential-kind applicability queries.
    fn enabled(&self) -> bool {
        true
    }

    /// Scope tiers this provider can serve at contexts of the given kind.
    fn supported_scopes(&self, kind: &ContextKind) -> Vec<CredentialScope>;

    /// Credential type tags this provider can produce, for applicability
    /// queries. Empty means unspecified.
    fn credential_kinds(&self) -> Vec<String> {
        Vec::new()
    }

    /// The store(s) this provider exposes for `context`: none when the
    /// context is not applicable, usually exactly one.
    async fn stores_for(
        &self,
        context: &Arc<dyn Context>,
    ) -> CoreResult<Vec<Arc<dyn CredentialsStore>>>;
}

struct Registration {
    priority: i32,
    order: usize,
    provider: Arc<dyn CredentialsProvider>,
}

/// Prioritized collection of providers.
///
/// Iteration order is ascending priority number; ties keep registration
/// order (stable). The registry is an explicitly constructed service object
/// that gets passed down; there is no globally reachable instance.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<Registration>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, priority: i32, provider: Arc<dyn CredentialsProvider>) {
        let order = self.entries.len();
        self.entries.push(Registration {
            priority,
            order,
            provider,
        });
        self.entries.sort_by_key(|r| (r.priority, r.order));
    }

    /// Removes a provider; stores it produced earlier become orphans that
    /// report [`CoreError::ProviderMissing`] through [`ProviderRegistry::require`].
    pub fn deregister(&mut self, provider_id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|r| r.provider.provider_id() != provider_id);
        self.entries.len() != before
    }

    /// Enabled providers in priority order.
    pub fn providers(&self) -> Vec<Arc<dyn CredentialsProvider>> {
        self.entries
            .iter()
            .filter(|r| r.provider.enabled())
            .map(|r| Arc::clone(&r.provider))
            .collect()
    }

    /// Looks a provider up by id, disabled ones included; a store whose
    /// backer is gone gets a hard error rather than silently partial data.
    pub fn require(&self, provider_id: &str) -> CoreResult<Arc<dyn CredentialsProvider>> {
        self.entries
            .iter()
            .find(|r| r.provider.provider_id() == provider_id)
            .map(|r| Arc::clone(&r.provider))
            .ok_or_else(|| CoreError::ProviderMissing {
                provider: provider_id.to_string(),
            })
    }

    /// Union of scope tiers enabled providers serve at contexts of `kind`,
    /// in provider order.
    pub fn supported_scopes(&self, kind: &ContextKind) -> Vec<CredentialScope> {
        let mut out = Vec::new();
        for provider in self.providers() {
            for scope in provider.supported_scopes(kind) {
                if !out.contains(&scope) {
                    out.push(scope);
                }
            }
        }
        out
    }

    /// Union of credential type tags enabled providers declare.
    pub fn credential_kinds(&self) -> Vec<String> {
        let mut out = Vec::new();
        for provider in self.providers() {
            for kind in provider.credential_kinds() {
                if !out.contains(&kind) {
                    out.push(kind);
                }
            }
        }
        out
    }

    /// All stores reachable for `context`, in provider priority order.
    /// Callers that need per-provider time bounds iterate
    /// [`ProviderRegistry::providers`] themselves, as the resolution engine
    /// does.
    pub async fn stores_for(
        &self,
        context: &Arc<dyn Context>,
    ) -> CoreResult<Vec<Arc<dyn CredentialsStore>>> {
        let mut stores = Vec::new();
        for provider in self.providers() {
            stores.extend(provider.stores_for(context).await?);
        }
        Ok(stores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::local::LocalProvider;
    use credtree_spec::ContextNode;

    #[tokio::test]
    async fn priority_order_with_stable_ties() {
        let mut registry = ProviderRegistry::new();
        registry.register(10, Arc::new(LocalProvider::new("b", &[CredentialScope::Global])));
        registry.register(0, Arc::new(LocalProvider::new("a", &[CredentialScope::Global])));
        registry.register(10, Arc::new(LocalProvider::new("c", &[CredentialScope::Global])));

        let providers = registry.providers();
        let ids: Vec<&str> = providers.iter().map(|p| p.provider_id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn disabled_provider_is_skipped_everywhere() {
        let mut registry = ProviderRegistry::new();
        let provider = Arc::new(
            LocalProvider::new("local", &[CredentialScope::System, CredentialScope::Global])
                .with_credential_kinds(["api-token", "ssh-key"]),
        );
        let root = ContextNode::root();
        provider.attach(&root);
        registry.register(0, provider.clone());

        assert_eq!(registry.providers().len(), 1);
        assert!(!registry.supported_scopes(&ContextKind::Root).is_empty());
        assert_eq!(registry.credential_kinds(), vec!["api-token", "ssh-key"]);
        assert_eq!(registry.stores_for(&root).await.unwrap().len(), 1);

        provider.set_enabled(false);
        assert!(registry.providers().is_empty());
        assert!(registry.supported_scopes(&ContextKind::Root).is_empty());
        assert!(registry.credential_kinds().is_empty());
        assert!(registry.stores_for(&root).await.unwrap().is_empty());

        // Disabled is not deregistered: lookups by id still succeed.
        assert!(registry.require("local").is_ok());
    }

    #[tokio::test]
    async fn deregistered_provider_is_a_hard_error() {
        let mut registry = ProviderRegistry::new();
        registry.register(
            0,
            Arc::new(LocalProvider::new("local", &[CredentialScope::Global])),
        );
        assert!(registry.deregister("local"));
        let err = registry.require("local").unwrap_err();
        assert!(matches!(err, CoreError::ProviderMissing { .. }));
    }
}
