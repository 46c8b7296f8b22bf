//! Actors and the permission seam consulted during resolution.

use crate::store::CredentialsStore;
use credtree_spec::ContextKind;
use serde::{Deserialize, Serialize};

/// The identity an operation is performed as.
///
/// For queued or deferred executions this is the identity the execution
/// actually runs as, never the identity that happened to trigger it: the
/// same job resolves the same credential set regardless of who pressed the
/// button. Per-user credential parameters opt out of this deliberately via
/// the binder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_context_id: Option<String>,
    #[serde(default)]
    system: bool,
}

impl Principal {
    /// The controller's own administrative identity.
    pub fn system() -> Self {
        Self {
            subject: "system".to_string(),
            user_context_id: None,
            system: true,
        }
    }

    /// A human user; owns the user context `user:<subject>`.
    pub fn user(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        let user_context_id = Some(format!("user:{subject}"));
        Self {
            subject,
            user_context_id,
            system: false,
        }
    }

    /// A non-human identity with no personal credential store.
    pub fn service(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            user_context_id: None,
            system: false,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Identifier of the principal's own user context, when it has one.
    pub fn user_context_id(&self) -> Option<&str> {
        self.user_context_id.as_deref()
    }

    /// Whether `context_id` names this principal's own user context.
    pub fn owns_user_context(&self, context_id: &str) -> bool {
        self.user_context_id.as_deref() == Some(context_id)
    }
}

/// Permission seam consulted by the resolution engine and by administrative
/// operations.
pub trait Authorizer: Send + Sync {
    /// Whether resolution may read from the store at all. A denied store is
    /// skipped silently; callers see empty results, not an error.
    fn can_read(&self, principal: &Principal, store: &dyn CredentialsStore) -> bool;

    /// Whether the principal may mutate the store. Administrative
    /// operations consult this and fail loudly when it denies.
    fn can_manage(&self, principal: &Principal, store: &dyn CredentialsStore) -> bool;
}

/// Default permission policy.
///
/// User stores are private: readable and manageable only by the owning user
/// or the system identity. Everything else is readable by any principal
/// (scope filtering keeps system-tier material out of ordinary contexts),
/// while management of root-context stores stays with the system identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessGuard;

impl Authorizer for AccessGuard {
    fn can_read(&self, principal: &Principal, store: &dyn CredentialsStore) -> bool {
        let context = store.context();
        match context.kind() {
            ContextKind::User => {
                principal.is_system() || principal.owns_user_context(context.context_id())
            }
            _ => true,
        }
    }

    fn can_manage(&self, principal: &Principal, store: &dyn CredentialsStore) -> bool {
        let context = store.context();
        match context.kind() {
            ContextKind::User => {
                principal.is_system() || principal.owns_user_context(context.context_id())
            }
            _ => principal.is_system(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use credtree_spec::{ContextNode, CredentialScope};
    use std::sync::Arc;

    #[test]
    fn user_store_readable_only_by_owner_or_system() {
        let guard = AccessGuard;
        let store = MemoryStore::new(
            "users",
            ContextNode::user("alice"),
            &[CredentialScope::User],
        );

        assert!(guard.can_read(&Principal::user("alice"), &store));
        assert!(guard.can_read(&Principal::system(), &store));
        assert!(!guard.can_read(&Principal::user("bob"), &store));
        assert!(!guard.can_read(&Principal::service("ci"), &store));
    }

    #[test]
    fn root_store_management_requires_system() {
        let guard = AccessGuard;
        let root = ContextNode::root();
        let store = MemoryStore::new(
            "local",
            Arc::clone(&root),
            &[CredentialScope::System, CredentialScope::Global],
        );

        assert!(guard.can_read(&Principal::user("alice"), &store));
        assert!(guard.can_manage(&Principal::system(), &store));
        assert!(!guard.can_manage(&Principal::user("alice"), &store));
    }
}
