use crate::error::{Error, Result};
use crate::scope::CredentialScope;
use crate::validate::validate_component;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// Identifier of a credential, unique within a (store, domain) pair.
///
/// Identifiers wrapped in `${...}` are rejected: that shape is reserved for
/// expression syntax and must never collide with a stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CredentialId(String);

impl CredentialId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() || (value.starts_with("${") && value.ends_with('}')) {
            return Err(Error::InvalidIdentifier { value });
        }
        validate_component(&value, "credential identifier")?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CredentialId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for CredentialId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        CredentialId::new(value).map_err(serde::de::Error::custom)
    }
}

/// Opaque handle into the external secret vault.
///
/// The secret payload itself is never held here; it is resolved lazily
/// through the vault seam when a consumer actually needs the material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SecretRef(String);

impl SecretRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored credential. Immutable once retrieved; only the secret payload
/// behind [`SecretRef`] is resolved lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Credential {
    id: CredentialId,
    scope: CredentialScope,
    kind: String,
    secret: SecretRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Credential {
    pub fn new(
        id: CredentialId,
        scope: CredentialScope,
        kind: impl Into<String>,
        secret: SecretRef,
    ) -> Result<Self> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(Error::EmptyComponent { field: "kind" });
        }
        Ok(Self {
            id,
            scope,
            kind,
            secret,
            description: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &CredentialId {
        &self.id
    }

    pub fn scope(&self) -> CredentialScope {
        self.scope
    }

    /// Type tag, e.g. `username-password` or `ssh-key`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn secret(&self) -> &SecretRef {
        &self.secret
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Type filter used by resolution; an empty query tag accepts any kind.
    pub fn assignable_to(&self, kind: &str) -> bool {
        kind.is_empty() || self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rejects_expression_syntax() {
        assert!(CredentialId::new("${secret.token}").is_err());
        assert!(CredentialId::new("").is_err());
        assert!(CredentialId::new("   ").is_err());
        assert!(CredentialId::new("deploy key").is_err());
        assert!(CredentialId::new("deploy-key").is_ok());
        assert!(CredentialId::new("svc@prod:token+1").is_ok());
    }

    #[test]
    fn identifier_deserialization_validates() {
        let ok: CredentialId = serde_json::from_str("\"deploy-key\"").unwrap();
        assert_eq!(ok.as_str(), "deploy-key");
        assert!(serde_json::from_str::<CredentialId>("\"${oops}\"").is_err());
    }

    #[test]
    fn credential_requires_a_kind() {
        let id = CredentialId::new("token").unwrap();
        assert!(
            Credential::new(
                id.clone(),
                CredentialScope::Global,
                "",
                SecretRef::new("v-1")
            )
            .is_err()
        );

        let cred = Credential::new(
            id,
            CredentialScope::Global,
            "api-token",
            SecretRef::new("v-1"),
        )
        .unwrap()
        .with_description("deploy token");
        assert!(cred.assignable_to("api-token"));
        assert!(cred.assignable_to(""));
        assert!(!cred.assignable_to("ssh-key"));
        assert_eq!(cred.description(), Some("deploy token"));
    }

    #[test]
    fn credential_serde_round_trip() {
        let cred = Credential::new(
            CredentialId::new("db-password").unwrap(),
            CredentialScope::System,
            "username-password",
            SecretRef::new("vault-7"),
        )
        .unwrap();

        let json = serde_json::to_string(&cred).unwrap();
        let back: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(cred, back);
    }
}
