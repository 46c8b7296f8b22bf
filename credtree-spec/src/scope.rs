use crate::context::ContextKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// Visibility tier of a credential.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub enum CredentialScope {
    /// Reserved for the controller itself; reachable only from root and agent contexts.
    System,
    /// Visible at the declaring context and every descendant.
    Global,
    /// Private to a single user; reachable only through that user's own context.
    User,
}

impl CredentialScope {
    /// Whether a credential of this tier may be surfaced when resolution
    /// originates from a context of the given kind.
    ///
    /// Total over every kind, including [`ContextKind::Custom`]; the system
    /// tier defaults to `false` for kinds it does not recognize. User-tier
    /// credentials are structurally visible everywhere; actual reachability
    /// is gated by the resolution walk, which only includes a user context
    /// when the caller opts in.
    pub fn visible_in(self, kind: &ContextKind) -> bool {
        match self {
            CredentialScope::System => matches!(kind, ContextKind::Root | ContextKind::Agent),
            CredentialScope::Global => true,
            CredentialScope::User => true,
        }
    }

    /// Display label; plays no part in resolution.
    pub const fn description(self) -> &'static str {
        match self {
            CredentialScope::System => "system",
            CredentialScope::Global => "global",
            CredentialScope::User => "user",
        }
    }

    /// Tiers that credentials attached to a context of the given kind may carry.
    pub fn contextually_valid(kind: &ContextKind) -> &'static [CredentialScope] {
        match kind {
            ContextKind::Root | ContextKind::Agent => {
                &[CredentialScope::System, CredentialScope::Global]
            }
            ContextKind::User => &[CredentialScope::User, CredentialScope::Global],
            _ => &[CredentialScope::Global],
        }
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl FromStr for CredentialScope {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(CredentialScope::System),
            "global" => Ok(CredentialScope::Global),
            "user" => Ok(CredentialScope::User),
            other => Err(crate::error::Error::Invalid(
                "scope".into(),
                other.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_tier_limited_to_root_and_agent() {
        assert!(CredentialScope::System.visible_in(&ContextKind::Root));
        assert!(CredentialScope::System.visible_in(&ContextKind::Agent));
        assert!(!CredentialScope::System.visible_in(&ContextKind::Folder));
        assert!(!CredentialScope::System.visible_in(&ContextKind::Item));
        assert!(!CredentialScope::System.visible_in(&ContextKind::User));
        assert!(!CredentialScope::System.visible_in(&ContextKind::Custom("pipeline".into())));
    }

    #[test]
    fn global_and_user_tiers_are_structurally_visible_everywhere() {
        let kinds = [
            ContextKind::Root,
            ContextKind::Folder,
            ContextKind::Item,
            ContextKind::User,
            ContextKind::Agent,
            ContextKind::Custom("pipeline".into()),
        ];
        for kind in &kinds {
            assert!(CredentialScope::Global.visible_in(kind));
            assert!(CredentialScope::User.visible_in(kind));
        }
    }

    #[test]
    fn visibility_is_deterministic() {
        let kind = ContextKind::Item;
        let first = CredentialScope::System.visible_in(&kind);
        for _ in 0..10 {
            assert_eq!(CredentialScope::System.visible_in(&kind), first);
        }
    }

    #[test]
    fn scope_round_trips_through_str() {
        for scope in [
            CredentialScope::System,
            CredentialScope::Global,
            CredentialScope::User,
        ] {
            assert_eq!(scope.to_string().parse::<CredentialScope>().unwrap(), scope);
        }
        assert!("everything".parse::<CredentialScope>().is_err());
    }
}
