//! Seam to the external secret store. At-rest encryption lives behind this
//! trait; the engine only ever moves opaque [`SecretRef`] handles around.

use crate::errors::{CoreError, CoreResult};
use credtree_spec::SecretRef;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// External secret-store collaborator.
pub trait SecretVault: Send + Sync {
    /// Stores the payload and returns an opaque handle to it.
    fn seal(&self, plain: &[u8]) -> CoreResult<SecretRef>;

    /// Resolves a handle back to the payload.
    fn open(&self, secret: &SecretRef) -> CoreResult<Vec<u8>>;
}

/// In-process vault for embedded use and tests.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    counter: AtomicU64,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretVault for MemoryVault {
    fn seal(&self, plain: &[u8]) -> CoreResult<SecretRef> {
        let handle = format!("mem-{}", self.counter.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock().unwrap();
        entries.insert(handle.clone(), plain.to_vec());
        Ok(SecretRef::new(handle))
    }

    fn open(&self, secret: &SecretRef) -> CoreResult<Vec<u8>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(secret.as_str())
            .cloned()
            .ok_or_else(|| CoreError::Vault(format!("unknown secret reference `{secret}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_round_trips() {
        let vault = MemoryVault::new();
        let handle = vault.seal(b"hunter2").unwrap();
        assert_eq!(vault.open(&handle).unwrap(), b"hunter2");
    }

    #[test]
    fn unknown_reference_is_a_vault_error() {
        let vault = MemoryVault::new();
        let err = vault.open(&SecretRef::new("mem-404")).unwrap_err();
        assert!(matches!(err, CoreError::Vault(_)));
    }
}
