//! Reconciliation of declaratively supplied credential sets with previously
//! existing store state.

use credtree_spec::{DomainEntry, StoreContents};
use std::str::FromStr;

/// How configuration application treats state not present in the incoming
/// document. The choice is an external switch; the engine never decides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Reconcile without deleting untracked domains or credentials.
    Merge,
    /// Discard everything not present in the incoming map.
    #[default]
    Replace,
}

impl MergeStrategy {
    pub const ENV_VAR: &'static str = "CREDTREE_CONFIG_STRATEGY";

    /// Reads the strategy from `CREDTREE_CONFIG_STRATEGY`; anything other
    /// than `merge` keeps the default `Replace`.
    pub fn from_env() -> Self {
        std::env::var(Self::ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for MergeStrategy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeStrategy::Merge),
            "replace" => Ok(MergeStrategy::Replace),
            _ => Err(()),
        }
    }
}

/// Reconciles `incoming` into `existing` without destroying untracked state.
///
/// Domains join by name: renaming a domain introduces a new one, while
/// updating the description or specifications of a kept name is an
/// update-in-place. Matched credential lists start from the existing order:
/// entries re-stated by `incoming` are replaced at their existing position,
/// new ones are appended, and entries absent from `incoming` are retained
/// unchanged. Iteration order is the insertion order of both maps; when an
/// incoming map states one domain name twice the later statement wins.
/// Idempotent: `merge(merge(e, i), i) == merge(e, i)`.
pub fn merge(existing: &StoreContents, incoming: &StoreContents) -> StoreContents {
    let mut entries: Vec<DomainEntry> = existing.iter().cloned().collect();

    for inbound in incoming.iter() {
        match entries
            .iter_mut()
            .find(|entry| entry.domain.name() == inbound.domain.name())
        {
            Some(current) => {
                current.domain = inbound.domain.clone();
                for credential in &inbound.credentials {
                    match current
                        .credentials
                        .iter_mut()
                        .find(|c| c.id() == credential.id())
                    {
                        Some(slot) => *slot = credential.clone(),
                        None => current.credentials.push(credential.clone()),
                    }
                }
            }
            None => entries.push(inbound.clone()),
        }
    }

    // Joining two maps that each satisfy the store invariants cannot
    // introduce a duplicate name or identifier.
    StoreContents::from_entries_unchecked(entries)
}

/// Applies the selected strategy.
pub fn apply(
    strategy: MergeStrategy,
    existing: &StoreContents,
    incoming: &StoreContents,
) -> StoreContents {
    match strategy {
        MergeStrategy::Merge => merge(existing, incoming),
        MergeStrategy::Replace => incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credtree_spec::{
        Credential, CredentialId, CredentialScope, Domain, SecretRef, Specification,
    };

    fn credential(id: &str, description: &str) -> Credential {
        Credential::new(
            CredentialId::new(id).unwrap(),
            CredentialScope::Global,
            "api-token",
            SecretRef::new(format!("vault-{id}")),
        )
        .unwrap()
        .with_description(description)
    }

    fn contents(entries: Vec<(Domain, Vec<Credential>)>) -> StoreContents {
        let mut out = StoreContents::new();
        for (domain, credentials) in entries {
            for credential in credentials {
                out.add_credential(&domain, credential).unwrap();
            }
            if out.entry(domain.name()).is_none() {
                out.insert_domain(domain).unwrap();
            }
        }
        out
    }

    #[test]
    fn concrete_merge_scenario() {
        let existing = contents(vec![(
            Domain::global(),
            vec![credential("foo", "d1"), credential("bar", "d2")],
        )]);
        let incoming = contents(vec![(
            Domain::global(),
            vec![credential("foo", "d1-updated"), credential("baz", "d3")],
        )]);

        let merged = merge(&existing, &incoming);
        let creds = merged.credentials(None);
        assert_eq!(creds.len(), 3);
        assert_eq!(creds[0].id().as_str(), "foo");
        assert_eq!(creds[0].description(), Some("d1-updated"));
        assert_eq!(creds[1].id().as_str(), "bar");
        assert_eq!(creds[1].description(), Some("d2"));
        assert_eq!(creds[2].id().as_str(), "baz");
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = contents(vec![(
            Domain::global(),
            vec![credential("foo", "d1"), credential("bar", "d2")],
        )]);
        let incoming = contents(vec![(
            Domain::global(),
            vec![credential("foo", "d1-updated"), credential("baz", "d3")],
        )]);

        let once = merge(&existing, &incoming);
        let twice = merge(&once, &incoming);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_deletes_untouched_state() {
        let hosts = Domain::named("hosts").unwrap();
        let legacy = Domain::named("legacy").unwrap();
        let existing = contents(vec![
            (hosts.clone(), vec![credential("kept", "old")]),
            (legacy.clone(), vec![credential("ancient", "old")]),
        ]);
        let incoming = contents(vec![(hosts.clone(), vec![credential("fresh", "new")])]);

        let merged = merge(&existing, &incoming);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.credentials(Some("hosts"))[0].description(),
            Some("old")
        );
        assert_eq!(merged.credentials(Some("hosts"))[1].id().as_str(), "fresh");
        assert_eq!(merged.credentials(Some("legacy")).len(), 1);
    }

    #[test]
    fn domain_name_is_the_join_key() {
        let before = Domain::named("hosts")
            .unwrap()
            .with_description("old wording");
        let after = Domain::named("hosts")
            .unwrap()
            .with_description("new wording")
            .with_specification(Specification::Hostname {
                includes: vec!["github.com".into()],
                excludes: vec![],
            });

        let existing = contents(vec![(before, vec![credential("kept", "d")])]);
        let incoming = contents(vec![(after.clone(), vec![])]);

        let merged = merge(&existing, &incoming);
        assert_eq!(merged.len(), 1);
        let entry = merged.entry(Some("hosts")).unwrap();
        assert_eq!(entry.domain, after);
        assert_eq!(entry.credentials.len(), 1);
    }

    #[test]
    fn replace_discards_untracked_state() {
        let existing = contents(vec![(Domain::global(), vec![credential("old", "d")])]);
        let incoming = contents(vec![(Domain::global(), vec![credential("new", "d")])]);

        let replaced = apply(MergeStrategy::Replace, &existing, &incoming);
        assert_eq!(replaced, incoming);

        let merged = apply(MergeStrategy::Merge, &existing, &incoming);
        assert_eq!(merged.credentials(None).len(), 2);
    }

    #[test]
    fn strategy_parses_from_env_values() {
        assert_eq!("merge".parse::<MergeStrategy>(), Ok(MergeStrategy::Merge));
        assert_eq!(
            "REPLACE".parse::<MergeStrategy>(),
            Ok(MergeStrategy::Replace)
        );
        assert!("upsert".parse::<MergeStrategy>().is_err());
        assert_eq!(MergeStrategy::default(), MergeStrategy::Replace);
    }
}
