//! Declarative configuration: a root node carrying the default
//! system-scoped store contents plus named provider-scoped sub-nodes.

use crate::errors::CoreResult;
use crate::merge::{self, MergeStrategy};
use crate::store::CredentialsStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use credtree_spec::StoreContents;

/// Configuration-as-data for credential stores.
///
/// Whether application merges with or replaces previously existing store
/// state is selected externally (`CREDTREE_CONFIG_STRATEGY`, default
/// replace); the document itself never carries that decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Contents of the default system-scoped store at the root context.
    #[serde(default)]
    pub system: StoreContents,
    /// Contents for named provider-scoped stores. Iteration order is the
    /// map's sorted key order, so application is deterministic.
    #[serde(default)]
    pub providers: BTreeMap<String, StoreContents>,
}

impl CredentialsConfig {
    pub fn from_yaml(raw: &str) -> CoreResult<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json(raw: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn provider_node(&self, name: &str) -> Option<&StoreContents> {
        self.providers.get(name)
    }

    /// Applies the system node to the given store.
    pub fn apply_system(
        &self,
        store: &dyn CredentialsStore,
        strategy: MergeStrategy,
    ) -> CoreResult<()> {
        apply_contents(store, &self.system, strategy)
    }

    /// Applies one named provider node to the given store; a name with no
    /// node in the document leaves the store untouched.
    pub fn apply_provider(
        &self,
        name: &str,
        store: &dyn CredentialsStore,
        strategy: MergeStrategy,
    ) -> CoreResult<()> {
        match self.providers.get(name) {
            Some(contents) => apply_contents(store, contents, strategy),
            None => Ok(()),
        }
    }
}

fn apply_contents(
    store: &dyn CredentialsStore,
    incoming: &StoreContents,
    strategy: MergeStrategy,
) -> CoreResult<()> {
    let existing = store.contents();
    let next = merge::apply(strategy, &existing, incoming);
    tracing::debug!(
        store = %store.store_id(),
        strategy = ?strategy,
        domains = next.len(),
        credentials = next.credential_count(),
        "applying configured credentials"
    );
    store.replace_contents(next)
}
