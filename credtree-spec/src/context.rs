use std::fmt;
use std::sync::Arc;

/// Classification of a node in the administrative hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// The root system context.
    Root,
    /// A nestable folder or project grouping.
    Folder,
    /// A runnable item such as a job.
    Item,
    /// A single user's private context.
    User,
    /// A computer/agent context.
    Agent,
    /// A context type contributed by an extension.
    Custom(String),
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Root => f.write_str("root"),
            ContextKind::Folder => f.write_str("folder"),
            ContextKind::Item => f.write_str("item"),
            ContextKind::User => f.write_str("user"),
            ContextKind::Agent => f.write_str("agent"),
            ContextKind::Custom(name) => f.write_str(name),
        }
    }
}

/// A node in the context tree.
///
/// Every context type implements an explicit get-parent capability; the
/// resolution engine walks `parent()` until `None` and never branches on
/// concrete context types.
pub trait Context: Send + Sync {
    /// Stable identifier, unique within the tree.
    fn context_id(&self) -> &str;

    /// The node's classification.
    fn kind(&self) -> &ContextKind;

    /// Parent node, or `None` at the top of the tree.
    fn parent(&self) -> Option<Arc<dyn Context>>;
}

/// Nearest-first walk: the context itself, then each ancestor up to the root.
pub fn ancestry(context: &Arc<dyn Context>) -> Vec<Arc<dyn Context>> {
    let mut walk = Vec::new();
    let mut cursor = Some(Arc::clone(context));
    while let Some(node) = cursor {
        cursor = node.parent();
        walk.push(node);
    }
    walk
}

/// Standard context-tree node.
pub struct ContextNode {
    id: String,
    kind: ContextKind,
    parent: Option<Arc<dyn Context>>,
}

impl ContextNode {
    /// The root system context.
    pub fn root() -> Arc<dyn Context> {
        Arc::new(ContextNode {
            id: "root".to_string(),
            kind: ContextKind::Root,
            parent: None,
        })
    }

    /// A folder nested under `parent`.
    pub fn folder(parent: &Arc<dyn Context>, name: &str) -> Arc<dyn Context> {
        Self::child(parent, ContextKind::Folder, name)
    }

    /// A runnable item nested under `parent`.
    pub fn item(parent: &Arc<dyn Context>, name: &str) -> Arc<dyn Context> {
        Self::child(parent, ContextKind::Item, name)
    }

    /// An agent nested under `parent`.
    pub fn agent(parent: &Arc<dyn Context>, name: &str) -> Arc<dyn Context> {
        Self::child(parent, ContextKind::Agent, name)
    }

    /// A user's private context. Users are leaves outside the inheritance tree.
    pub fn user(name: &str) -> Arc<dyn Context> {
        Arc::new(ContextNode {
            id: format!("user:{name}"),
            kind: ContextKind::User,
            parent: None,
        })
    }

    /// A context of an extension-contributed kind.
    pub fn custom(parent: Option<&Arc<dyn Context>>, kind: &str, name: &str) -> Arc<dyn Context> {
        let id = match parent {
            Some(parent) => format!("{}/{name}", parent.context_id()),
            None => name.to_string(),
        };
        Arc::new(ContextNode {
            id,
            kind: ContextKind::Custom(kind.to_string()),
            parent: parent.map(Arc::clone),
        })
    }

    fn child(parent: &Arc<dyn Context>, kind: ContextKind, name: &str) -> Arc<dyn Context> {
        Arc::new(ContextNode {
            id: format!("{}/{name}", parent.context_id()),
            kind,
            parent: Some(Arc::clone(parent)),
        })
    }
}

impl Context for ContextNode {
    fn context_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &ContextKind {
        &self.kind
    }

    fn parent(&self) -> Option<Arc<dyn Context>> {
        self.parent.as_ref().map(Arc::clone)
    }
}

impl fmt::Debug for ContextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}
