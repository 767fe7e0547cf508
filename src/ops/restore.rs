use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::model::{LoadError, NodeId, SessionState, TreeModel};

/// Re-applies a saved session to a freshly opened tree.
///
/// Holds the saved expanded set and cursor until the cascade settles. Each
/// time a directory finishes loading, its children that appear in the saved
/// set are expanded, which loads them and continues one level deeper.
#[derive(Debug, Default)]
pub struct CascadeRestore {
    expanded: HashSet<PathBuf>,
    cursor: Option<PathBuf>,
}

/// What one cascade step did
#[derive(Debug, Default)]
pub struct CascadeReport {
    /// Directories expanded (and therefore freshly loaded) by the cascade
    pub expanded: Vec<NodeId>,
    pub failures: Vec<LoadError>,
}

impl CascadeRestore {
    pub fn new(state: Option<SessionState>) -> Self {
        let Some(state) = state else {
            return Self::default();
        };
        CascadeRestore {
            expanded: state.expanded.into_iter().map(PathBuf::from).collect(),
            cursor: state.cursor.map(PathBuf::from),
        }
    }

    /// True while there is anything left to restore
    pub fn is_pending(&self) -> bool {
        !self.expanded.is_empty() || self.cursor.is_some()
    }

    /// Expand saved directories below `dir`, level by level, until no loaded
    /// child matches the saved set. Each saved path is applied at most once.
    pub fn on_loaded(&mut self, tree: &mut TreeModel, dir: NodeId) -> CascadeReport {
        let mut report = CascadeReport::default();
        let mut queue = vec![dir];
        while let Some(current) = queue.pop() {
            if self.expanded.is_empty() {
                break;
            }
            let matches: Vec<NodeId> = tree
                .children(current)
                .iter()
                .copied()
                .filter(|&child| {
                    tree.get(child).is_some_and(|n| {
                        n.is_dir() && !n.expanded && self.expanded.contains(&n.path)
                    })
                })
                .collect();
            for child in matches {
                if let Some(path) = tree.path_of(child) {
                    self.expanded.remove(path);
                }
                match tree.expand(child) {
                    Ok(()) => {
                        queue.push(child);
                        report.expanded.push(child);
                    }
                    Err(e) => {
                        warn!(error = %e, "could not restore expanded directory");
                        report.failures.push(e);
                    }
                }
            }
        }
        report
    }

    /// Finish the restore: move the cursor to the saved path if it is now in
    /// the tree, and drop whatever did not match. Returns true if the cursor
    /// moved.
    pub fn settle(&mut self, tree: &mut TreeModel) -> bool {
        let unmatched = self.expanded.len();
        self.expanded.clear();
        let Some(target) = self.cursor.take() else {
            return false;
        };
        let found = tree
            .preorder(tree.root())
            .into_iter()
            .find(|&id| tree.path_of(id) == Some(target.as_path()));
        debug!(
            cursor = %target.display(),
            found = found.is_some(),
            unmatched,
            "session restore settled"
        );
        match found {
            Some(id) => tree.set_cursor(id),
            None => false,
        }
    }

    /// Run the whole cascade from the root and settle. Used at startup once the
    /// root has been listed.
    pub fn run(&mut self, tree: &mut TreeModel) -> CascadeReport {
        let report = self.on_loaded(tree, tree.root());
        self.settle(tree);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn state(expanded: &[PathBuf], cursor: Option<PathBuf>) -> SessionState {
        SessionState {
            expanded: expanded
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            cursor: cursor.map(|p| p.to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn cascade_expands_nested_levels_and_restores_cursor() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("A/B")).unwrap();
        fs::write(root.join("A/B/c.txt"), "").unwrap();
        fs::create_dir(root.join("Z")).unwrap();

        let mut tree = TreeModel::open(root).unwrap();
        tree.load_children(tree.root()).unwrap();
        let mut restore = CascadeRestore::new(Some(state(
            &[root.to_path_buf(), root.join("A"), root.join("A/B")],
            Some(root.join("A/B/c.txt")),
        )));
        assert!(restore.is_pending());

        let report = restore.run(&mut tree);
        assert_eq!(report.expanded.len(), 2);
        assert!(report.failures.is_empty());
        assert!(!restore.is_pending());

        let z = tree.find(&root.join("Z")).unwrap();
        assert!(!tree.get(z).unwrap().expanded);
        let cursor = tree.cursor_node().unwrap();
        assert_eq!(cursor.path, root.join("A/B/c.txt"));
    }

    #[test]
    fn missing_cursor_leaves_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("A")).unwrap();
        let mut tree = TreeModel::open(tmp.path()).unwrap();
        tree.load_children(tree.root()).unwrap();
        let mut restore = CascadeRestore::new(Some(state(
            &[tmp.path().join("gone")],
            Some(tmp.path().join("gone/x")),
        )));
        let report = restore.run(&mut tree);
        assert!(report.expanded.is_empty());
        assert_eq!(tree.cursor(), tree.root());
    }

    #[test]
    fn unreadable_directory_is_a_failure_not_an_expansion() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("A")).unwrap();
        let mut tree = TreeModel::open(tmp.path()).unwrap();
        tree.load_children(tree.root()).unwrap();
        fs::remove_dir(tmp.path().join("A")).unwrap();

        let mut restore = CascadeRestore::new(Some(state(&[tmp.path().join("A")], None)));
        let report = restore.run(&mut tree);
        assert!(report.expanded.is_empty());
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn no_saved_state_is_not_pending() {
        let restore = CascadeRestore::new(None);
        assert!(!restore.is_pending());
    }
}
