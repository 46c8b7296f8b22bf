//! Per-execution association of credential parameters with the identity
//! that supplied them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A runtime association between an execution parameter, a credential
/// identifier and the submitting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub credential_id: String,
    #[serde(default)]
    pub is_default: bool,
}

/// A parameter value tagged as a credential parameter at queue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParameterValue {
    pub name: String,
    pub credential_id: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Bindings for a single execution record.
///
/// Independently scheduled steps of the same execution bind and unbind
/// concurrently; every operation takes the one internal lock, so rebinding
/// a parameter name replaces the previous binding rather than accumulating.
#[derive(Debug, Default)]
pub struct ExecutionBindings {
    inner: Mutex<HashMap<String, Binding>>,
}

impl ExecutionBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the binding for `parameter`; last write wins.
    pub fn bind(
        &self,
        user: Option<&str>,
        parameter: &str,
        credential_id: &str,
        is_default: bool,
    ) {
        let binding = Binding {
            parameter: parameter.to_string(),
            user: user.map(str::to_string),
            credential_id: credential_id.to_string(),
            is_default,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.insert(parameter.to_string(), binding);
    }

    pub fn unbind(&self, parameter: &str) -> Option<Binding> {
        let mut inner = self.inner.lock().unwrap();
        inner.remove(parameter)
    }

    pub fn lookup(&self, parameter: &str) -> Option<Binding> {
        let inner = self.inner.lock().unwrap();
        inner.get(parameter).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Bindings sorted by parameter name.
    pub fn snapshot(&self) -> Vec<Binding> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<Binding> = inner.values().cloned().collect();
        out.sort_by(|a, b| a.parameter.cmp(&b.parameter));
        out
    }
}

/// Owns the binding state of every live execution.
///
/// State for an execution is created lazily on first access and discarded
/// with the execution record; executions are isolated from each other, so
/// there is no cross-execution locking.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    executions: Mutex<HashMap<String, Arc<ExecutionBindings>>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bindings of `execution_id`, created on first access.
    pub fn for_execution(&self, execution_id: &str) -> Arc<ExecutionBindings> {
        let mut executions = self.executions.lock().unwrap();
        Arc::clone(
            executions
                .entry(execution_id.to_string())
                .or_insert_with(|| Arc::new(ExecutionBindings::new())),
        )
    }

    /// The bindings of `execution_id` without creating them.
    pub fn peek(&self, execution_id: &str) -> Option<Arc<ExecutionBindings>> {
        let executions = self.executions.lock().unwrap();
        executions.get(execution_id).cloned()
    }

    /// Drops the state together with the execution record.
    pub fn discard(&self, execution_id: &str) -> bool {
        let mut executions = self.executions.lock().unwrap();
        executions.remove(execution_id).is_some()
    }

    /// Seeds bindings from the credential-tagged parameter values supplied
    /// at execution start, associated with the triggering user when known.
    pub fn seed(
        &self,
        execution_id: &str,
        parameters: &[CredentialParameterValue],
        triggering_user: Option<&str>,
    ) {
        let bindings = self.for_execution(execution_id);
        for parameter in parameters {
            bindings.bind(
                triggering_user,
                &parameter.name,
                &parameter.credential_id,
                parameter.is_default,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let bindings = ExecutionBindings::new();
        bindings.bind(Some("u1"), "param1", "cred-A", false);
        bindings.bind(None, "param1", "cred-B", true);

        let binding = bindings.lookup("param1").unwrap();
        assert_eq!(binding.credential_id, "cred-B");
        assert_eq!(binding.user, None);
        assert!(binding.is_default);
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn unbind_removes_and_lookup_reports_absence() {
        let bindings = ExecutionBindings::new();
        bindings.bind(Some("u1"), "param1", "cred-A", false);
        assert!(bindings.unbind("param1").is_some());
        assert!(bindings.unbind("param1").is_none());
        assert!(bindings.lookup("param1").is_none());
        assert!(bindings.is_empty());
    }

    #[test]
    fn registry_creates_lazily_and_discards() {
        let registry = BindingRegistry::new();
        assert!(registry.peek("run-1").is_none());

        let first = registry.for_execution("run-1");
        let second = registry.for_execution("run-1");
        assert!(Arc::ptr_eq(&first, &second));

        assert!(registry.discard("run-1"));
        assert!(!registry.discard("run-1"));
        assert!(registry.peek("run-1").is_none());
    }

    #[test]
    fn seeding_attributes_to_the_triggering_user() {
        let registry = BindingRegistry::new();
        registry.seed(
            "run-1",
            &[
                CredentialParameterValue {
                    name: "deploy".into(),
                    credential_id: "cred-A".into(),
                    is_default: true,
                },
                CredentialParameterValue {
                    name: "notify".into(),
                    credential_id: "cred-B".into(),
                    is_default: false,
                },
            ],
            Some("alice"),
        );

        let bindings = registry.peek("run-1").unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(
            bindings.lookup("deploy").unwrap().user.as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn concurrent_steps_of_one_execution_interleave_safely() {
        let registry = Arc::new(BindingRegistry::new());
        let mut handles = Vec::new();
        for step in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                let bindings = registry.for_execution("run-1");
                for round in 0..50 {
                    let parameter = format!("param{}", round % 4);
                    bindings.bind(None, &parameter, &format!("cred-{step}-{round}"), false);
                    bindings.lookup(&parameter);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let bindings = registry.peek("run-1").unwrap();
        assert_eq!(bindings.len(), 4);
    }
}
