use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::node::NodeId;

/// Two-way lookup between absolute paths and node identities.
///
/// The forward direction lives here; the reverse direction is the node's own
/// `path` field, so the tree keeps both in sync when it creates or discards
/// nodes.
#[derive(Debug, Default, Clone)]
pub struct PathIndex {
    by_path: HashMap<PathBuf, NodeId>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// Register `path`. Returns the id previously bound to it, if any.
    pub fn insert(&mut self, path: PathBuf, id: NodeId) -> Option<NodeId> {
        self.by_path.insert(path, id)
    }

    pub fn remove(&mut self, path: &Path) -> Option<NodeId> {
        self.by_path.remove(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut index = PathIndex::new();
        assert!(index.insert(PathBuf::from("/a"), NodeId(1)).is_none());
        assert_eq!(index.get(Path::new("/a")), Some(NodeId(1)));
        assert_eq!(index.insert(PathBuf::from("/a"), NodeId(2)), Some(NodeId(1)));
        assert_eq!(index.remove(Path::new("/a")), Some(NodeId(2)));
        assert!(index.is_empty());
    }
}
