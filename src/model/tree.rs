use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::node::{IgnoreStatus, Node, NodeId, NodeKind};
use super::path_index::PathIndex;

/// Error type for directory listing
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub kind: NodeKind,
}

/// List a directory in display order.
///
/// Entries that vanish or cannot be inspected mid-listing are skipped.
/// Symlinks are classified by their target.
pub fn list_dir(path: &Path) -> Result<Vec<ListedEntry>, LoadError> {
    let read_dir = fs::read_dir(path).map_err(|e| LoadError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let Ok(entry) = entry else { continue };
        let entry_path = entry.path();
        let kind = if entry_path.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        entries.push(ListedEntry {
            path: entry_path,
            kind,
        });
    }
    entries.sort_by(compare_entries);
    Ok(entries)
}

/// Directories first, then files; case-insensitive name, exact name as tiebreak
fn compare_entries(a: &ListedEntry, b: &ListedEntry) -> Ordering {
    let a_dir = a.kind == NodeKind::Directory;
    let b_dir = b.kind == NodeKind::Directory;
    b_dir.cmp(&a_dir).then_with(|| {
        let a_name = a.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let b_name = b.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        a_name
            .to_lowercase()
            .cmp(&b_name.to_lowercase())
            .then_with(|| a_name.cmp(&b_name))
    })
}

enum Planned {
    Keep(NodeId),
    Create(ListedEntry),
}

/// What a reload changed, for logging and tests
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub kept: usize,
}

/// The lazily loaded tree rooted at one directory.
///
/// Owns every node (arena of slots) plus the path index, the cursor and the
/// expansion flags. All mutation happens on the thread that owns the model.
#[derive(Debug)]
pub struct TreeModel {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: PathIndex,
    root: NodeId,
    cursor: NodeId,
}

impl TreeModel {
    /// Create a tree for `root`. The root starts expanded but unloaded.
    pub fn open(root: &Path) -> Result<Self, LoadError> {
        if !root.is_dir() {
            return Err(LoadError::NotADirectory(root.to_path_buf()));
        }
        let id = NodeId(0);
        let mut node = Node::new(id, root.to_path_buf(), NodeKind::Directory, None);
        node.expanded = true;
        let mut index = PathIndex::new();
        index.insert(root.to_path_buf(), id);
        Ok(TreeModel {
            slots: vec![Some(node)],
            free: Vec::new(),
            index,
            root: id,
            cursor: id,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> &Path {
        self.path_of(self.root).unwrap_or(Path::new(""))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Look up a loaded node by absolute path
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.index.get(path)
    }

    pub fn path_of(&self, id: NodeId) -> Option<&Path> {
        self.get(id).map(|n| n.path.as_path())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Loaded children of `id` in display order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.child_ids()).unwrap_or(&[])
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn cursor_node(&self) -> Option<&Node> {
        self.get(self.cursor)
    }

    /// Move the cursor. Ignored if `id` is not a live node.
    pub fn set_cursor(&mut self, id: NodeId) -> bool {
        if self.contains(id) {
            self.cursor = id;
            true
        } else {
            false
        }
    }

    pub fn set_ignored(&mut self, id: NodeId, status: IgnoreStatus) {
        if let Some(node) = self.get_mut(id) {
            node.ignored = status;
        }
    }

    /// List `id` if it has never been listed. Already-loaded directories and
    /// files are left alone.
    pub fn load_children(&mut self, id: NodeId) -> Result<(), LoadError> {
        match self.get(id) {
            Some(node) if node.is_dir() && !node.is_loaded() => self.reload(id).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Re-list a directory, diffing against the current children.
    ///
    /// Paths present before and after keep their node (and with it the
    /// `expanded` flag, loaded subtree and ignore status). A path whose kind
    /// changed is replaced by a fresh node. On a listing failure the directory
    /// becomes loaded-empty and the error is returned.
    pub fn reload(&mut self, id: NodeId) -> Result<ReloadSummary, LoadError> {
        let Some(node) = self.get(id) else {
            return Ok(ReloadSummary::default());
        };
        if !node.is_dir() {
            return Ok(ReloadSummary::default());
        }
        let dir_path = node.path.clone();
        let previous: HashMap<PathBuf, (NodeId, NodeKind)> = node
            .child_ids()
            .iter()
            .filter_map(|&child| self.get(child).map(|c| (c.path.clone(), (child, c.kind))))
            .collect();

        let listing = match list_dir(&dir_path) {
            Ok(listing) => listing,
            Err(e) => {
                let old: Vec<NodeId> = previous.values().map(|(child, _)| *child).collect();
                self.replace_children(id, Vec::new(), &old);
                return Err(e);
            }
        };

        let mut summary = ReloadSummary::default();
        let mut plan = Vec::with_capacity(listing.len());
        let mut stale = Vec::new();
        let mut present = HashSet::with_capacity(listing.len());

        for entry in listing {
            present.insert(entry.path.clone());
            match previous.get(&entry.path) {
                Some(&(child, kind)) if kind == entry.kind => {
                    summary.kept += 1;
                    plan.push(Planned::Keep(child));
                }
                Some(&(child, _)) => {
                    // Kind flipped on disk: the old node is stale, build a new one
                    stale.push(child);
                    summary.removed.push(entry.path.clone());
                    summary.added.push(entry.path.clone());
                    plan.push(Planned::Create(entry));
                }
                None => {
                    summary.added.push(entry.path.clone());
                    plan.push(Planned::Create(entry));
                }
            }
        }

        for (path, &(child, _)) in &previous {
            if !present.contains(path) {
                summary.removed.push(path.clone());
                stale.push(child);
            }
        }
        summary.removed.sort();

        // Discard before allocating so the index never sees a path twice
        let cursor_lost = self.discard_many(&stale);

        let fresh: Vec<NodeId> = plan
            .into_iter()
            .map(|planned| match planned {
                Planned::Keep(child) => child,
                Planned::Create(entry) => self.alloc(entry.path, entry.kind, id),
            })
            .collect();

        if let Some(node) = self.get_mut(id) {
            node.children = Some(fresh);
        }
        if cursor_lost {
            self.cursor = id;
        }

        debug!(
            dir = %dir_path.display(),
            added = summary.added.len(),
            removed = summary.removed.len(),
            kept = summary.kept,
            "reloaded directory"
        );
        Ok(summary)
    }

    /// Flip a directory's expansion. Collapsing the root is rejected.
    pub fn toggle(&mut self, id: NodeId) -> Result<(), LoadError> {
        let Some(node) = self.get(id) else {
            return Ok(());
        };
        if !node.is_dir() {
            return Ok(());
        }
        if node.expanded {
            self.collapse(id);
            Ok(())
        } else {
            self.expand(id)
        }
    }

    /// Expand a directory, listing it if needed
    pub fn expand(&mut self, id: NodeId) -> Result<(), LoadError> {
        match self.get_mut(id) {
            Some(node) if node.is_dir() => node.expanded = true,
            _ => return Ok(()),
        }
        self.load_children(id)
    }

    /// Collapse a directory and discard its children, so the next expansion
    /// re-lists from disk. No-op on the root.
    pub fn collapse(&mut self, id: NodeId) {
        let old = match self.get(id) {
            Some(node) if node.is_dir() && !node.is_root() => node.child_ids().to_vec(),
            _ => return,
        };
        let cursor_lost = self.discard_many(&old);
        if let Some(node) = self.get_mut(id) {
            node.expanded = false;
            node.children = None;
        }
        if cursor_lost {
            self.cursor = id;
        }
    }

    /// Absolute paths of every expanded directory, root included, in
    /// depth-first order
    pub fn expanded_paths(&self) -> Vec<PathBuf> {
        self.preorder(self.root)
            .into_iter()
            .filter_map(|id| self.get(id))
            .filter(|n| n.is_dir() && n.expanded)
            .map(|n| n.path.clone())
            .collect()
    }

    /// Depth-first pre-order over the loaded subtree at `id`, including `id`
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else { continue };
            out.push(current);
            stack.extend(node.child_ids().iter().rev());
        }
        out
    }

    fn alloc(&mut self, path: PathBuf, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = match self.free.pop() {
            Some(slot) => NodeId(slot),
            None => {
                self.slots.push(None);
                NodeId(self.slots.len() - 1)
            }
        };
        self.index.insert(path.clone(), id);
        self.slots[id.0] = Some(Node::new(id, path, kind, Some(parent)));
        id
    }

    fn replace_children(&mut self, id: NodeId, children: Vec<NodeId>, old: &[NodeId]) {
        let cursor_lost = self.discard_many(old);
        if let Some(node) = self.get_mut(id) {
            node.children = Some(children);
        }
        if cursor_lost {
            self.cursor = id;
        }
    }

    /// Free each subtree. Returns true if the cursor was inside one of them.
    fn discard_many(&mut self, ids: &[NodeId]) -> bool {
        let mut cursor_lost = false;
        for &id in ids {
            for gone in self.preorder(id) {
                if gone == self.cursor {
                    cursor_lost = true;
                }
                if let Some(node) = self.slots[gone.0].take() {
                    self.index.remove(&node.path);
                    self.free.push(gone.0);
                }
            }
        }
        cursor_lost
    }
}
