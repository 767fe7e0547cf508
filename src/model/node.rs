use std::path::{Path, PathBuf};

/// Stable identity of a node inside a [`TreeModel`](super::tree::TreeModel).
///
/// Identities are arena slots. A slot freed by a reload may be reused later
/// by an unrelated path, so ids must not be held across reloads by code that
/// does not also own the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Filesystem kind of a node, fixed at listing time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Result of the ignore overlay for a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnoreStatus {
    /// Not classified yet, or the classifier failed. Rendered like `NotIgnored`.
    #[default]
    Unknown,
    Ignored,
    NotIgnored,
}

impl IgnoreStatus {
    pub fn is_ignored(self) -> bool {
        self == IgnoreStatus::Ignored
    }
}

/// One entry of the in-memory tree, mirroring a filesystem path
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Absolute path, unique within the tree
    pub path: PathBuf,
    /// Display name (final path component, or the full path for the root)
    pub name: String,
    pub kind: NodeKind,
    /// Non-owning back link; `None` only for the root
    pub parent: Option<NodeId>,
    /// `None` until the directory has been listed. `Some(vec![])` is a loaded,
    /// empty directory.
    pub children: Option<Vec<NodeId>>,
    pub expanded: bool,
    pub ignored: IgnoreStatus,
}

impl Node {
    pub(crate) fn new(id: NodeId, path: PathBuf, kind: NodeKind, parent: Option<NodeId>) -> Self {
        let name = display_name(&path);
        Node {
            id,
            path,
            name,
            kind,
            parent,
            children: None,
            expanded: false,
            ignored: IgnoreStatus::Unknown,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Loaded children, or an empty slice for unloaded directories and files
    pub fn child_ids(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }
}

fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_starts_unloaded_and_unknown() {
        let node = Node::new(
            NodeId(3),
            PathBuf::from("/proj/src"),
            NodeKind::Directory,
            Some(NodeId(0)),
        );
        assert_eq!(node.name, "src");
        assert!(!node.is_loaded());
        assert!(!node.expanded);
        assert_eq!(node.ignored, IgnoreStatus::Unknown);
        assert!(node.child_ids().is_empty());
    }

    #[test]
    fn root_name_falls_back_to_full_path() {
        let node = Node::new(NodeId(0), PathBuf::from("/"), NodeKind::Directory, None);
        assert_eq!(node.name, "/");
        assert!(node.is_root());
    }

    #[test]
    fn unknown_is_not_ignored() {
        assert!(!IgnoreStatus::Unknown.is_ignored());
        assert!(!IgnoreStatus::NotIgnored.is_ignored());
        assert!(IgnoreStatus::Ignored.is_ignored());
    }
}
