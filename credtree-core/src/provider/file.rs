//! Provider of file-backed stores, one JSON document per attached context.

use crate::errors::CoreResult;
use crate::provider::CredentialsProvider;
use crate::store::CredentialsStore;
use crate::store::file::FileStore;
use async_trait::async_trait;
use credtree_spec::{Context, ContextKind, CredentialScope};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Persists each attached context's store under a root directory.
pub struct FileProvider {
    id: String,
    root: PathBuf,
    declared: Vec<CredentialScope>,
    stores: RwLock<HashMap<String, Arc<FileStore>>>,
}

impl std::fmt::Debug for FileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProvider")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("declared", &self.declared)
            .finish_non_exhaustive()
    }
}

impl FileProvider {
    pub fn new(
        id: impl Into<String>,
        root: impl Into<PathBuf>,
        declared: &[CredentialScope],
    ) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            declared: declared.to_vec(),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Opens (or returns) the persisted store for `context`.
    pub fn attach(&self, context: &Arc<dyn Context>) -> Arc<FileStore> {
        let mut stores = self.stores.write().unwrap();
        Arc::clone(
            stores
                .entry(context.context_id().to_string())
                .or_insert_with(|| {
                    let file = format!("{}.json", sanitize_segment(context.context_id()));
                    Arc::new(FileStore::open(
                        self.id.clone(),
                        Arc::clone(context),
                        &self.declared,
                        self.root.join(file),
                    ))
                }),
        )
    }
}

fn sanitize_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

#[async_trait]
impl CredentialsProvider for FileProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn supported_scopes(&self, kind: &ContextKind) -> Vec<CredentialScope> {
        CredentialScope::contextually_valid(kind)
            .iter()
            .copied()
            .filter(|scope| self.declared.contains(scope))
            .collect()
    }

    async fn stores_for(
        &self,
        context: &Arc<dyn Context>,
    ) -> CoreResult<Vec<Arc<dyn CredentialsStore>>> {
        let stores = self.stores.read().unwrap();
        Ok(stores
            .get(context.context_id())
            .map(|store| vec![Arc::clone(store) as Arc<dyn CredentialsStore>])
            .unwrap_or_default())
    }
}
