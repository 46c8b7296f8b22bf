//! File-backed store: one JSON document per context-scoped store.

use crate::errors::CoreResult;
use crate::store::{CredentialsStore, effective_scopes};
use credtree_spec::{Context, Credential, CredentialScope, Domain, StoreContents};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tempfile::NamedTempFile;

/// Store persisted as a single JSON file.
///
/// A missing file is an empty store. Malformed content also degrades to an
/// empty store instead of propagating a parse failure to callers; the
/// anomaly is logged and counted on a diagnostic side channel. Writes go
/// through a temp file and an atomic rename, and [`FileStore::reload`]
/// swaps the in-memory map in one step, so readers never observe a
/// half-written state.
pub struct FileStore {
    provider_id: String,
    context: Arc<dyn Context>,
    scopes: Vec<CredentialScope>,
    path: PathBuf,
    contents: RwLock<StoreContents>,
    corrupt_loads: AtomicUsize,
}

impl FileStore {
    pub fn open(
        provider_id: impl Into<String>,
        context: Arc<dyn Context>,
        declared_scopes: &[CredentialScope],
        path: impl AsRef<Path>,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        let scopes = effective_scopes(declared_scopes, context.kind());
        let store = Self {
            provider_id: provider_id.into(),
            context,
            scopes,
            path,
            contents: RwLock::new(StoreContents::new()),
            corrupt_loads: AtomicUsize::new(0),
        };
        let loaded = store.read_disk();
        *store.contents.write().unwrap() = loaded;
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of loads that found malformed content since this store opened.
    pub fn corrupt_loads(&self) -> usize {
        self.corrupt_loads.load(Ordering::Relaxed)
    }

    /// Re-reads the backing file and swaps the in-memory map atomically.
    pub fn reload(&self) {
        let loaded = self.read_disk();
        *self.contents.write().unwrap() = loaded;
    }

    fn read_disk(&self) -> StoreContents {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return StoreContents::new();
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to read persisted store, treating as empty"
                );
                self.corrupt_loads.fetch_add(1, Ordering::Relaxed);
                return StoreContents::new();
            }
        };

        match serde_json::from_slice::<StoreContents>(&raw) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "malformed persisted store, treating as empty"
                );
                self.corrupt_loads.fetch_add(1, Ordering::Relaxed);
                StoreContents::new()
            }
        }
    }

    fn persist(&self, contents: &StoreContents) -> CoreResult<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let raw = serde_json::to_vec_pretty(contents)?;
        let tmp = NamedTempFile::new_in(parent)?;
        std::fs::write(tmp.path(), &raw)?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    /// Applies a mutation and persists it while holding the write lock, so
    /// mutations on one store are sequenced and the file always reflects a
    /// fully applied state.
    fn mutate<F>(&self, apply: F) -> CoreResult<()>
    where
        F: FnOnce(&mut StoreContents) -> CoreResult<()>,
    {
        let mut guard = self.contents.write().unwrap();
        let mut next = guard.clone();
        apply(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

impl CredentialsStore for FileStore {
    fn store_id(&self) -> String {
        format!("{}@{}", self.provider_id, self.context.context_id())
    }

    fn context(&self) -> Arc<dyn Context> {
        Arc::clone(&self.context)
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn supported_scopes(&self) -> Vec<CredentialScope> {
        self.scopes.clone()
    }

    fn domains(&self) -> Vec<Domain> {
        self.contents.read().unwrap().domains()
    }

    fn credentials(&self, domain: &Domain) -> Vec<Credential> {
        self.contents
            .read()
            .unwrap()
            .credentials(domain.name())
            .to_vec()
    }

    fn contents(&self) -> StoreContents {
        self.contents.read().unwrap().clone()
    }

    fn writable(&self) -> bool {
        true
    }

    fn add(&self, domain: &Domain, credential: Credential) -> CoreResult<()> {
        self.mutate(|contents| Ok(contents.add_credential(domain, credential)?))
    }

    fn update(&self, domain: &Domain, credential: Credential) -> CoreResult<()> {
        self.mutate(|contents| Ok(contents.update_credential(domain.name(), credential)?))
    }

    fn remove(&self, domain: &Domain, id: &str) -> CoreResult<()> {
        self.mutate(|contents| {
            contents.remove_credential(domain.name(), id)?;
            Ok(())
        })
    }

    fn replace_contents(&self, next: StoreContents) -> CoreResult<()> {
        self.mutate(|contents| {
            *contents = next;
            Ok(())
        })
    }
}
