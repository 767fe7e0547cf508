use crate::model::{LoadError, NodeId, TreeModel};

/// A cursor or expansion command issued by the interaction layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Up,
    Down,
    Top,
    Bottom,
    PageUp(usize),
    PageDown(usize),
    /// Expand or collapse the cursor directory. Never moves the cursor.
    Toggle,
    JumpPrevSiblingDir,
    JumpNextSiblingDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Prev,
    Next,
}

/// A visible row in the flattened tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub id: NodeId,
    pub depth: usize,
    pub is_last_sibling: bool,
    /// For building tree guide lines: whether each ancestor below the root is
    /// the last of its siblings
    pub ancestor_last: Vec<bool>,
}

/// Flatten the tree into visible rows: the root, then every loaded child of
/// each expanded directory, depth first.
pub fn flatten(tree: &TreeModel) -> Vec<FlatRow> {
    let mut rows = Vec::with_capacity(tree.len());
    rows.push(FlatRow {
        id: tree.root(),
        depth: 0,
        is_last_sibling: true,
        ancestor_last: Vec::new(),
    });
    flatten_inner(tree, tree.root(), 1, &mut rows, &[]);
    rows
}

fn flatten_inner(
    tree: &TreeModel,
    dir: NodeId,
    depth: usize,
    rows: &mut Vec<FlatRow>,
    ancestor_last: &[bool],
) {
    let expanded = tree.get(dir).is_some_and(|n| n.expanded);
    if !expanded {
        return;
    }
    let children = tree.children(dir);
    let count = children.len();
    for (i, &child) in children.iter().enumerate() {
        let is_last = i + 1 == count;
        rows.push(FlatRow {
            id: child,
            depth,
            is_last_sibling: is_last,
            ancestor_last: ancestor_last.to_vec(),
        });
        if tree.get(child).is_some_and(|n| n.is_dir() && n.expanded) {
            let mut nested = ancestor_last.to_vec();
            nested.push(is_last);
            flatten_inner(tree, child, depth + 1, rows, &nested);
        }
    }
}

/// Where the cursor goes for `command`. Pure: reads the tree, never mutates.
pub fn next_cursor(command: NavCommand, tree: &TreeModel, cursor: NodeId) -> NodeId {
    match command {
        NavCommand::Toggle => cursor,
        NavCommand::JumpPrevSiblingDir => jump_sibling_dir(tree, cursor, Direction::Prev),
        NavCommand::JumpNextSiblingDir => jump_sibling_dir(tree, cursor, Direction::Next),
        NavCommand::Up => move_by(tree, cursor, -1),
        NavCommand::Down => move_by(tree, cursor, 1),
        NavCommand::PageUp(n) => move_by(tree, cursor, -(n.max(1) as isize)),
        NavCommand::PageDown(n) => move_by(tree, cursor, n.max(1) as isize),
        NavCommand::Top => tree.root(),
        NavCommand::Bottom => flatten(tree).last().map_or(cursor, |row| row.id),
    }
}

/// Apply `command` to the tree: toggles expansion or moves the cursor
pub fn apply(command: NavCommand, tree: &mut TreeModel) -> Result<(), LoadError> {
    let cursor = tree.cursor();
    if command == NavCommand::Toggle {
        return tree.toggle(cursor);
    }
    let next = next_cursor(command, tree, cursor);
    tree.set_cursor(next);
    Ok(())
}

/// Clamped move along the flattened rows
fn move_by(tree: &TreeModel, cursor: NodeId, delta: isize) -> NodeId {
    let rows = flatten(tree);
    let Some(pos) = rows.iter().position(|row| row.id == cursor) else {
        return cursor;
    };
    let target = pos
        .saturating_add_signed(delta)
        .min(rows.len().saturating_sub(1));
    rows[target].id
}

/// Jump to the adjacent sibling directory, falling back to the parent at the
/// edge (or when there is nothing to jump to). No-op on the root.
fn jump_sibling_dir(tree: &TreeModel, cursor: NodeId, direction: Direction) -> NodeId {
    let Some(parent) = tree.parent(cursor) else {
        return cursor;
    };
    let siblings = tree.children(parent);
    let is_dir = |id: &NodeId| tree.get(*id).is_some_and(|n| n.is_dir());
    let dirs: Vec<NodeId> = siblings.iter().copied().filter(|id| is_dir(id)).collect();

    if dirs.is_empty() {
        return parent;
    }

    if is_dir(&cursor)
        && let Some(idx) = dirs.iter().position(|&d| d == cursor)
    {
        let target = match direction {
            Direction::Prev => idx.checked_sub(1).map(|i| dirs[i]),
            Direction::Next => dirs.get(idx + 1).copied(),
        };
        return target.unwrap_or(parent);
    }

    // On a file: nearest directory before/after it in the full sibling list
    let Some(pos) = siblings.iter().position(|&s| s == cursor) else {
        return parent;
    };
    let found = match direction {
        Direction::Prev => siblings[..pos].iter().rev().find(|id| is_dir(*id)),
        Direction::Next => siblings[pos + 1..].iter().find(|id| is_dir(*id)),
    };
    found.copied().unwrap_or(parent)
}
