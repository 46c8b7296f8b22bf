use crate::credential::Credential;
use crate::domain::Domain;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One domain and the credentials filed under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub domain: Domain,
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl DomainEntry {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            credentials: Vec::new(),
        }
    }
}

/// The domain→credentials map owned by one store.
///
/// Entries keep insertion order; that order is the documented iteration
/// order relied upon by the merge engine for deterministic conflict
/// resolution. Invariants: domain names are unique (at most one global
/// domain), and credential identifiers are unique within each domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreContents {
    entries: Vec<DomainEntry>,
}

impl StoreContents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds contents from pre-assembled entries, enforcing the invariants.
    pub fn from_entries(entries: Vec<DomainEntry>) -> Result<Self> {
        let contents = Self { entries };
        contents.validate()?;
        Ok(contents)
    }

    /// Builds contents from entries already known to satisfy the invariants,
    /// e.g. the output of merging two validated maps.
    pub fn from_entries_unchecked(entries: Vec<DomainEntry>) -> Self {
        Self { entries }
    }

    pub fn validate(&self) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            let name = entry.domain.name();
            if self.entries[..index].iter().any(|e| e.domain.name() == name) {
                return Err(Error::DuplicateDomain {
                    name: name.unwrap_or("(global)").to_string(),
                });
            }
            for (cindex, credential) in entry.credentials.iter().enumerate() {
                if entry.credentials[..cindex]
                    .iter()
                    .any(|c| c.id() == credential.id())
                {
                    return Err(Error::DuplicateCredential {
                        id: credential.id().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of domains.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn credential_count(&self) -> usize {
        self.entries.iter().map(|e| e.credentials.len()).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DomainEntry> {
        self.entries.iter()
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.entries.iter().map(|e| e.domain.clone()).collect()
    }

    /// Looks an entry up by domain name; `None` addresses the global domain.
    pub fn entry(&self, name: Option<&str>) -> Option<&DomainEntry> {
        self.entries.iter().find(|e| e.domain.name() == name)
    }

    pub fn entry_mut(&mut self, name: Option<&str>) -> Option<&mut DomainEntry> {
        self.entries.iter_mut().find(|e| e.domain.name() == name)
    }

    pub fn credentials(&self, name: Option<&str>) -> &[Credential] {
        self.entry(name).map(|e| e.credentials.as_slice()).unwrap_or(&[])
    }

    /// Adds a domain with no credentials yet.
    pub fn insert_domain(&mut self, domain: Domain) -> Result<()> {
        if self.entry(domain.name()).is_some() {
            return Err(Error::DuplicateDomain {
                name: domain.name().unwrap_or("(global)").to_string(),
            });
        }
        self.entries.push(DomainEntry::new(domain));
        Ok(())
    }

    /// Files a credential under the domain, creating the domain entry when
    /// it is not present yet.
    pub fn add_credential(&mut self, domain: &Domain, credential: Credential) -> Result<()> {
        if let Some(entry) = self.entry_mut(domain.name()) {
            if entry.credentials.iter().any(|c| c.id() == credential.id()) {
                return Err(Error::DuplicateCredential {
                    id: credential.id().to_string(),
                });
            }
            entry.credentials.push(credential);
            return Ok(());
        }

        let mut entry = DomainEntry::new(domain.clone());
        entry.credentials.push(credential);
        self.entries.push(entry);
        Ok(())
    }

    /// Replaces the credential with the same identifier, keeping its position.
    pub fn update_credential(&mut self, name: Option<&str>, credential: Credential) -> Result<()> {
        let entry = self.entry_mut(name).ok_or_else(|| Error::NotFound {
            entity: format!("domain `{}`", name.unwrap_or("(global)")),
        })?;
        let slot = entry
            .credentials
            .iter_mut()
            .find(|c| c.id() == credential.id())
            .ok_or_else(|| Error::NotFound {
                entity: format!("credential `{}`", credential.id()),
            })?;
        *slot = credential;
        Ok(())
    }

    pub fn remove_credential(&mut self, name: Option<&str>, id: &str) -> Result<Credential> {
        let entry = self.entry_mut(name).ok_or_else(|| Error::NotFound {
            entity: format!("domain `{}`", name.unwrap_or("(global)")),
        })?;
        let position = entry
            .credentials
            .iter()
            .position(|c| c.id().as_str() == id)
            .ok_or_else(|| Error::NotFound {
                entity: format!("credential `{id}`"),
            })?;
        Ok(entry.credentials.remove(position))
    }
}

impl<'de> Deserialize<'de> for StoreContents {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            entries: Vec<DomainEntry>,
        }

        let raw = Raw::deserialize(deserializer)?;
        StoreContents::from_entries(raw.entries).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CredentialId, SecretRef};
    use crate::scope::CredentialScope;

    fn credential(id: &str) -> Credential {
        Credential::new(
            CredentialId::new(id).unwrap(),
            CredentialScope::Global,
            "api-token",
            SecretRef::new(format!("vault-{id}")),
        )
        .unwrap()
    }

    #[test]
    fn at_most_one_global_domain() {
        let mut contents = StoreContents::new();
        contents.insert_domain(Domain::global()).unwrap();
        let err = contents.insert_domain(Domain::global()).unwrap_err();
        assert!(matches!(err, Error::DuplicateDomain { .. }));
    }

    #[test]
    fn identifiers_unique_within_domain_but_not_across() {
        let mut contents = StoreContents::new();
        let global = Domain::global();
        let hosts = Domain::named("hosts").unwrap();

        contents.add_credential(&global, credential("token")).unwrap();
        let err = contents
            .add_credential(&global, credential("token"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCredential { .. }));

        // Same identifier in a different domain is fine.
        contents.add_credential(&hosts, credential("token")).unwrap();
        assert_eq!(contents.credential_count(), 2);
    }

    #[test]
    fn update_keeps_position_and_remove_reports_missing() {
        let mut contents = StoreContents::new();
        let global = Domain::global();
        contents.add_credential(&global, credential("a")).unwrap();
        contents.add_credential(&global, credential("b")).unwrap();

        let replacement = credential("a").with_description("rotated");
        contents.update_credential(None, replacement).unwrap();
        let creds = contents.credentials(None);
        assert_eq!(creds[0].id().as_str(), "a");
        assert_eq!(creds[0].description(), Some("rotated"));

        assert!(contents.remove_credential(None, "missing").is_err());
        contents.remove_credential(None, "a").unwrap();
        assert_eq!(contents.credentials(None).len(), 1);
    }

    #[test]
    fn deserialization_enforces_invariants() {
        let json = r#"{
            "entries": [
                { "domain": {}, "credentials": [] },
                { "domain": {}, "credentials": [] }
            ]
        }"#;
        assert!(serde_json::from_str::<StoreContents>(json).is_err());

        let ok = r#"{
            "entries": [
                {
                    "domain": { "name": "hosts" },
                    "credentials": [
                        {
                            "id": "token",
                            "scope": "global",
                            "kind": "api-token",
                            "secret": "vault-1"
                        }
                    ]
                }
            ]
        }"#;
        let contents: StoreContents = serde_json::from_str(ok).unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents.credentials(Some("hosts")).len(), 1);
    }
}
