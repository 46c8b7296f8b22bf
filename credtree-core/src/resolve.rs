//! The resolution engine: walks the context hierarchy and the provider
//! registry to answer which credentials a principal can see and use.

use crate::errors::{CoreError, CoreResult};
use crate::principal::{AccessGuard, Authorizer, Principal};
use crate::provider::{CredentialsProvider, ProviderRegistry};
use crate::store::CredentialsStore;
use crate::usage::UsageTracker;
use crate::vault::{MemoryVault, SecretVault};
use credtree_spec::{Context, Credential, CredentialId, CredentialScope, Requirement, ancestry};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Caller-supplied narrowing predicate; `None` accepts everything.
pub type CredentialMatcher<'a> = Option<&'a (dyn Fn(&Credential) -> bool + Send + Sync)>;

/// A secret payload together with proof that usage tracking ran.
///
/// `tracked` is `true` when this access created the usage record and `false`
/// when an earlier access already had, making the exactly-once obligation
/// observable by tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedSecret {
    pub value: Vec<u8>,
    pub tracked: bool,
}

/// Builder for [`Resolver`] instances.
#[derive(Default)]
pub struct ResolverBuilder {
    registry: Option<Arc<ProviderRegistry>>,
    guard: Option<Arc<dyn Authorizer>>,
    tracker: Option<Arc<UsageTracker>>,
    vault: Option<Arc<dyn SecretVault>>,
    provider_timeout: Option<Duration>,
}

impl ResolverBuilder {
    /// Initialise the builder using environment configuration.
    ///
    /// * `CREDTREE_PROVIDER_TIMEOUT_SECS` bounds each provider call
    ///   (default: 10s).
    pub fn from_env() -> Self {
        let mut builder = ResolverBuilder::default();

        if let Ok(secs) = std::env::var("CREDTREE_PROVIDER_TIMEOUT_SECS") {
            if let Ok(seconds) = secs.parse::<u64>() {
                builder.provider_timeout = Some(Duration::from_secs(seconds.max(1)));
            }
        }

        builder
    }

    pub fn registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn guard(mut self, guard: Arc<dyn Authorizer>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn vault(mut self, vault: Arc<dyn SecretVault>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Override the per-provider time bound.
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> CoreResult<Resolver> {
        let registry = self
            .registry
            .ok_or_else(|| CoreError::Builder("resolver requires a provider registry".into()))?;
        Ok(Resolver {
            registry,
            guard: self.guard.unwrap_or_else(|| Arc::new(AccessGuard)),
            tracker: self.tracker.unwrap_or_default(),
            vault: self.vault.unwrap_or_else(|| Arc::new(MemoryVault::new())),
            provider_timeout: self.provider_timeout.unwrap_or(DEFAULT_PROVIDER_TIMEOUT),
        })
    }
}

/// Deterministic, deduplicating credential resolution over a provider
/// registry and a context tree.
pub struct Resolver {
    registry: Arc<ProviderRegistry>,
    guard: Arc<dyn Authorizer>,
    tracker: Arc<UsageTracker>,
    vault: Arc<dyn SecretVault>,
    provider_timeout: Duration,
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::from_env()
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }

    /// Lists credentials of `kind` visible from `context` for `principal`,
    /// narrowed by domain `requirements` and an optional `matcher`.
    ///
    /// The walk visits the context itself and then its ancestors up to the
    /// root; the principal's own user context is not consulted; see
    /// [`Resolver::list_with_user_store`]. Results keep walk order and are
    /// deduplicated by identifier, first occurrence winning (nearest
    /// context, highest provider priority). An empty result is a normal
    /// outcome, and stores the principal may not read contribute nothing
    /// rather than erroring.
    #[tracing::instrument(skip_all, fields(kind = %kind, context = %context.context_id()))]
    pub async fn list(
        &self,
        kind: &str,
        context: &Arc<dyn Context>,
        principal: &Principal,
        requirements: &[Requirement],
        matcher: CredentialMatcher<'_>,
    ) -> Vec<Credential> {
        self.collect(kind, context, principal, requirements, matcher, false)
            .await
    }

    /// Like [`Resolver::list`], but opts the principal's own user context
    /// into the walk (appended after the ancestry), making user-tier
    /// credentials reachable.
    #[tracing::instrument(skip_all, fields(kind = %kind, context = %context.context_id()))]
    pub async fn list_with_user_store(
        &self,
        kind: &str,
        context: &Arc<dyn Context>,
        principal: &Principal,
        requirements: &[Requirement],
        matcher: CredentialMatcher<'_>,
    ) -> Vec<Credential> {
        self.collect(kind, context, principal, requirements, matcher, true)
            .await
    }

    /// Resolves a single credential by identifier.
    ///
    /// `None` is a normal outcome and deliberately covers both "does not
    /// exist" and "not permitted"; existence is not leaked through this
    /// API.
    pub async fn find_by_id(
        &self,
        id: &str,
        kind: &str,
        context: &Arc<dyn Context>,
        principal: &Principal,
        requirements: &[Requirement],
    ) -> Option<Credential> {
        let matcher = move |credential: &Credential| credential.id().as_str() == id;
        self.collect(kind, context, principal, requirements, Some(&matcher), true)
            .await
            .into_iter()
            .next()
    }

    async fn collect(
        &self,
        kind: &str,
        context: &Arc<dyn Context>,
        principal: &Principal,
        requirements: &[Requirement],
        matcher: CredentialMatcher<'_>,
        include_user_store: bool,
    ) -> Vec<Credential> {
        let origin_kind = context.kind().clone();
        let mut walk = ancestry(context);
        if include_user_store {
            if let Some(user_context) = self.principal_context(principal, &walk) {
                walk.push(user_context);
            }
        }

        let mut seen: HashSet<CredentialId> = HashSet::new();
        let mut out = Vec::new();

        for node in &walk {
            for store in self.stores_bounded(node).await {
                if !self.guard.can_read(principal, store.as_ref()) {
                    tracing::debug!(store = %store.store_id(), "store skipped: principal may not read");
                    continue;
                }

                let snapshot = store.contents();
                for entry in snapshot.iter() {
                    if !entry.domain.matches(requirements) {
                        continue;
                    }
                    for credential in &entry.credentials {
                        if !credential.scope().visible_in(&origin_kind) {
                            continue;
                        }
                        if credential.scope() == CredentialScope::User
                            && !principal.owns_user_context(store.context().context_id())
                        {
                            continue;
                        }
                        if !credential.assignable_to(kind) {
                            continue;
                        }
                        if let Some(matcher) = matcher {
                            if !matcher(credential) {
                                continue;
                            }
                        }
                        if seen.insert(credential.id().clone()) {
                            out.push(credential.clone());
                        }
                    }
                }
            }
        }

        out
    }

    /// The principal's user context, when it has one. Already-walked user
    /// contexts are not appended twice.
    fn principal_context(
        &self,
        principal: &Principal,
        walk: &[Arc<dyn Context>],
    ) -> Option<Arc<dyn Context>> {
        let id = principal.user_context_id()?;
        if walk.iter().any(|node| node.context_id() == id) {
            return None;
        }
        let name = id.strip_prefix("user:").unwrap_or(id);
        Some(credtree_spec::ContextNode::user(name))
    }

    /// Stores for one context, bounding each provider call independently so
    /// a slow or failing provider cannot stall or abort unrelated
    /// contributions.
    async fn stores_bounded(&self, context: &Arc<dyn Context>) -> Vec<Arc<dyn CredentialsStore>> {
        let mut stores = Vec::new();
        for provider in self.registry.providers() {
            match tokio::time::timeout(self.provider_timeout, provider.stores_for(context)).await {
                Ok(Ok(batch)) => stores.extend(batch),
                Ok(Err(err)) => {
                    tracing::warn!(
                        provider = provider.provider_id(),
                        error = %err,
                        "credentials provider failed, contribution skipped"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        provider = provider.provider_id(),
                        timeout_ms = self.provider_timeout.as_millis() as u64,
                        "credentials provider timed out, contribution skipped"
                    );
                }
            }
        }
        stores
    }

    /// Records one logical secret access. Idempotent; returns `true` when a
    /// new usage record was created.
    pub fn track(&self, context: &Arc<dyn Context>, credential: &Credential) -> bool {
        self.tracker
            .track(context.context_id(), credential.id().as_str())
    }

    /// Records a batch of accesses; returns how many records were new.
    pub fn track_all(&self, context: &Arc<dyn Context>, credentials: &[Credential]) -> usize {
        credentials
            .iter()
            .filter(|credential| self.track(context, credential))
            .count()
    }

    /// Fetches the secret payload, fulfilling the tracking obligation as an
    /// explicit part of the result.
    pub fn reveal(
        &self,
        context: &Arc<dyn Context>,
        credential: &Credential,
    ) -> CoreResult<RevealedSecret> {
        let value = self.vault.open(credential.secret())?;
        let tracked = self.track(context, credential);
        Ok(RevealedSecret { value, tracked })
    }

    /// Validation/preview accessor: fetches the payload without recording a
    /// usage association.
    pub fn peek(&self, credential: &Credential) -> CoreResult<Vec<u8>> {
        self.vault.open(credential.secret())
    }

    /// The provider backing `store`, or [`CoreError::ProviderMissing`] when
    /// it was deregistered after the store was created. Fatal for that
    /// store only; unrelated stores resolve normally.
    pub fn backing_provider(
        &self,
        store: &dyn CredentialsStore,
    ) -> CoreResult<Arc<dyn CredentialsProvider>> {
        self.registry.require(store.provider_id())
    }

    /// Administrative mutation; unlike resolution, fails loudly on denial.
    pub fn add_credential(
        &self,
        principal: &Principal,
        store: &dyn CredentialsStore,
        domain: &credtree_spec::Domain,
        credential: Credential,
    ) -> CoreResult<()> {
        self.ensure_manage(principal, store, "add credential")?;
        store.add(domain, credential)
    }

    /// Administrative mutation; unlike resolution, fails loudly on denial.
    pub fn remove_credential(
        &self,
        principal: &Principal,
        store: &dyn CredentialsStore,
        domain: &credtree_spec::Domain,
        id: &str,
    ) -> CoreResult<()> {
        self.ensure_manage(principal, store, "remove credential")?;
        store.remove(domain, id)
    }

    fn ensure_manage(
        &self,
        principal: &Principal,
        store: &dyn CredentialsStore,
        action: &str,
    ) -> CoreResult<()> {
        if !self.guard.can_manage(principal, store) {
            return Err(CoreError::PermissionDenied {
                action: format!("{action} in {}", store.store_id()),
            });
        }
        Ok(())
    }
}
