//! Coalesces bursts of filesystem events into directory reloads.
//!
//! The watcher thread records raw changes through a [`DebounceHandle`]; the
//! thread that owns the tree asks [`ChangeDebouncer::take_due`] for the
//! pending set once the quiet period has passed, then reloads with [`flush`].
//! The pending set is the only state shared between the two threads, and the
//! lock around it is held only to insert or swap, never during listing.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::model::{LoadError, TreeModel};

/// Simplified event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
    /// `paths` holds the source and, when known, the destination
    Rename,
    Other,
}

impl ChangeKind {
    /// Whether the change alters the listing of the containing directory
    fn is_structural(self) -> bool {
        matches!(self, ChangeKind::Create | ChangeKind::Remove | ChangeKind::Rename)
    }
}

/// One raw filesystem event as delivered by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl RawChange {
    pub fn new(kind: ChangeKind, paths: Vec<PathBuf>) -> Self {
        RawChange { kind, paths }
    }
}

/// Drops events under noise directories (VCS metadata, caches, dependencies).
///
/// Only components below the watched root are considered, so a root that
/// itself lives under e.g. `target/` is still watched.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    root: PathBuf,
    names: HashSet<OsString>,
}

impl NoiseFilter {
    pub fn new(root: &Path, names: &[String]) -> Self {
        NoiseFilter {
            root: root.to_path_buf(),
            names: names.iter().map(OsString::from).collect(),
        }
    }

    pub fn is_noise(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .any(|c| self.names.contains(c.as_os_str()))
    }
}

#[derive(Debug, Default)]
struct Pending {
    dirs: HashSet<PathBuf>,
    deadline: Option<Instant>,
}

/// Cloneable enqueue side of the debouncer, handed to the watcher thread
#[derive(Debug, Clone)]
pub struct DebounceHandle {
    pending: Arc<Mutex<Pending>>,
    delay: Duration,
    noise: Arc<NoiseFilter>,
}

impl DebounceHandle {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the directories affected by `change`, restarting the timer
    pub fn record(&self, change: &RawChange) -> usize {
        self.record_at(change, Instant::now())
    }

    /// Like [`record`](Self::record) with an explicit clock. Returns how many
    /// directories were queued (after noise filtering).
    pub fn record_at(&self, change: &RawChange, now: Instant) -> usize {
        // Touch the filesystem before taking the lock
        let dirs = resolve_dirs(change, &self.noise);
        if dirs.is_empty() {
            return 0;
        }
        let count = dirs.len();
        let mut pending = self.lock();
        pending.dirs.extend(dirs);
        pending.deadline = Some(now + self.delay);
        count
    }
}

/// Directories whose listing may have changed because of `change`.
///
/// A directory path stands for itself, anything else for its parent. A
/// structural change to a directory also queues its parent, whose listing
/// gained or lost that entry.
fn resolve_dirs(change: &RawChange, noise: &NoiseFilter) -> Vec<PathBuf> {
    let mut dirs = Vec::with_capacity(change.paths.len());
    for path in &change.paths {
        if noise.is_noise(path) {
            continue;
        }
        if path.is_dir() {
            dirs.push(path.clone());
            if change.kind.is_structural()
                && let Some(parent) = path.parent()
            {
                dirs.push(parent.to_path_buf());
            }
        } else if let Some(parent) = path.parent() {
            dirs.push(parent.to_path_buf());
        }
    }
    dirs
}

/// Debounce timer plus the pending-directory set
#[derive(Debug)]
pub struct ChangeDebouncer {
    handle: DebounceHandle,
}

impl ChangeDebouncer {
    pub fn new(delay: Duration, noise: NoiseFilter) -> Self {
        ChangeDebouncer {
            handle: DebounceHandle {
                pending: Arc::new(Mutex::new(Pending::default())),
                delay,
                noise: Arc::new(noise),
            },
        }
    }

    pub fn handle(&self) -> DebounceHandle {
        self.handle.clone()
    }

    pub fn record_at(&self, change: &RawChange, now: Instant) -> usize {
        self.handle.record_at(change, now)
    }

    /// When the current burst will be flushed, if anything is pending
    pub fn next_deadline(&self) -> Option<Instant> {
        self.handle.lock().deadline
    }

    pub fn pending_len(&self) -> usize {
        self.handle.lock().dirs.len()
    }

    /// Swap out the pending set if the quiet period has elapsed. The returned
    /// directories are sorted.
    pub fn take_due(&self, now: Instant) -> Option<Vec<PathBuf>> {
        let taken = {
            let mut pending = self.handle.lock();
            match pending.deadline {
                Some(deadline) if now >= deadline => {
                    pending.deadline = None;
                    std::mem::take(&mut pending.dirs)
                }
                _ => return None,
            }
        };
        let mut dirs: Vec<PathBuf> = taken.into_iter().collect();
        dirs.sort();
        Some(dirs)
    }
}

/// Outcome of one flush
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Directories that were re-listed
    pub reloaded: Vec<PathBuf>,
    /// Queued directories that are not loaded-and-expanded in the tree
    pub skipped: usize,
    pub failures: Vec<LoadError>,
}

/// Reload every queued directory that is currently expanded. Each failure is
/// recorded and the rest of the batch continues.
pub fn flush(tree: &mut TreeModel, dirs: &[PathBuf]) -> FlushReport {
    let mut report = FlushReport::default();
    for dir in dirs {
        let target = tree
            .find(dir)
            .filter(|&id| tree.get(id).is_some_and(|n| n.expanded && n.is_loaded()));
        let Some(id) = target else {
            report.skipped += 1;
            continue;
        };
        match tree.reload(id) {
            Ok(_) => report.reloaded.push(dir.clone()),
            Err(e) => {
                warn!(error = %e, "reload failed");
                report.failures.push(e);
            }
        }
    }
    debug!(
        reloaded = report.reloaded.len(),
        skipped = report.skipped,
        failed = report.failures.len(),
        "flushed filesystem changes"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DELAY: Duration = Duration::from_millis(300);

    fn debouncer(root: &Path) -> ChangeDebouncer {
        let noise = NoiseFilter::new(root, &[".git".to_string(), "node_modules".to_string()]);
        ChangeDebouncer::new(DELAY, noise)
    }

    #[test]
    fn burst_coalesces_to_one_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        let deb = debouncer(tmp.path());
        let t0 = Instant::now();
        for i in 0..50 {
            let change = RawChange::new(
                ChangeKind::Modify,
                vec![tmp.path().join("src").join(format!("f{}.rs", i))],
            );
            deb.record_at(&change, t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(deb.pending_len(), 1);
        // last event at t0+490ms, so nothing is due until t0+790ms
        assert!(deb.take_due(t0 + Duration::from_millis(700)).is_none());
        let dirs = deb.take_due(t0 + Duration::from_millis(790)).unwrap();
        assert_eq!(dirs, vec![tmp.path().join("src")]);
        assert_eq!(deb.pending_len(), 0);
        assert!(deb.next_deadline().is_none());
    }

    #[test]
    fn each_event_restarts_the_timer() {
        let tmp = TempDir::new().unwrap();
        let deb = debouncer(tmp.path());
        let t0 = Instant::now();
        let change = RawChange::new(ChangeKind::Create, vec![tmp.path().join("a.txt")]);
        deb.record_at(&change, t0);
        assert_eq!(deb.next_deadline(), Some(t0 + DELAY));
        deb.record_at(&change, t0 + Duration::from_millis(200));
        assert_eq!(deb.next_deadline(), Some(t0 + Duration::from_millis(500)));
        assert!(deb.take_due(t0 + DELAY).is_none());
    }

    #[test]
    fn rename_within_one_directory_queues_it_once() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        let deb = debouncer(tmp.path());
        let change = RawChange::new(
            ChangeKind::Rename,
            vec![tmp.path().join("src/old.txt"), tmp.path().join("src/new.txt")],
        );
        deb.record_at(&change, Instant::now());
        assert_eq!(deb.pending_len(), 1);
    }

    #[test]
    fn rename_across_directories_queues_both() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("a")).unwrap();
        fs::create_dir(tmp.path().join("b")).unwrap();
        let deb = debouncer(tmp.path());
        let t0 = Instant::now();
        let change = RawChange::new(
            ChangeKind::Rename,
            vec![tmp.path().join("a/f.txt"), tmp.path().join("b/f.txt")],
        );
        deb.record_at(&change, t0);
        let dirs = deb.take_due(t0 + DELAY).unwrap();
        assert_eq!(dirs, vec![tmp.path().join("a"), tmp.path().join("b")]);
    }

    #[test]
    fn new_directory_queues_itself_and_parent() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("fresh")).unwrap();
        let deb = debouncer(tmp.path());
        let t0 = Instant::now();
        deb.record_at(
            &RawChange::new(ChangeKind::Create, vec![tmp.path().join("fresh")]),
            t0,
        );
        let dirs = deb.take_due(t0 + DELAY).unwrap();
        assert_eq!(dirs, vec![tmp.path().to_path_buf(), tmp.path().join("fresh")]);
    }

    #[test]
    fn noise_directories_are_dropped() {
        let tmp = TempDir::new().unwrap();
        let deb = debouncer(tmp.path());
        let queued = deb.record_at(
            &RawChange::new(
                ChangeKind::Modify,
                vec![
                    tmp.path().join(".git/index"),
                    tmp.path().join("web/node_modules/x/index.js"),
                ],
            ),
            Instant::now(),
        );
        assert_eq!(queued, 0);
        assert!(deb.next_deadline().is_none());
    }

    #[test]
    fn noise_check_ignores_components_above_root() {
        let filter = NoiseFilter::new(
            Path::new("/work/node_modules/pkg"),
            &["node_modules".to_string()],
        );
        assert!(!filter.is_noise(Path::new("/work/node_modules/pkg/src/a.js")));
        assert!(filter.is_noise(Path::new("/work/node_modules/pkg/node_modules/b")));
    }

    #[test]
    fn flush_reloads_only_expanded_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("open")).unwrap();
        fs::create_dir_all(tmp.path().join("closed")).unwrap();
        let mut tree = TreeModel::open(tmp.path()).unwrap();
        tree.load_children(tree.root()).unwrap();
        let open = tree.find(&tmp.path().join("open")).unwrap();
        tree.expand(open).unwrap();

        fs::write(tmp.path().join("open/new.txt"), "").unwrap();
        let report = flush(
            &mut tree,
            &[
                tmp.path().join("closed"),
                tmp.path().join("open"),
                tmp.path().join("not-in-tree"),
            ],
        );
        assert_eq!(report.reloaded, vec![tmp.path().join("open")]);
        assert_eq!(report.skipped, 2);
        assert!(tree.find(&tmp.path().join("open/new.txt")).is_some());
    }

    #[test]
    fn flush_failure_does_not_abort_batch() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        let mut tree = TreeModel::open(tmp.path()).unwrap();
        tree.load_children(tree.root()).unwrap();
        for name in ["a", "b"] {
            let id = tree.find(&tmp.path().join(name)).unwrap();
            tree.expand(id).unwrap();
        }
        fs::remove_dir(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("b/x.txt"), "").unwrap();

        let report = flush(&mut tree, &[tmp.path().join("a"), tmp.path().join("b")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.reloaded, vec![tmp.path().join("b")]);
        assert!(tree.find(&tmp.path().join("b/x.txt")).is_some());
    }
}
