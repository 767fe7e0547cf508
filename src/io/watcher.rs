use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use super::debounce::{ChangeKind, DebounceHandle, RawChange};

/// Error type for the recursive watch
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("could not watch {path}: {source}")]
    Start {
        path: PathBuf,
        source: notify::Error,
    },
    #[error("watch stream failed: {0}")]
    Stream(notify::Error),
}

/// Map a notify event onto a change worth reacting to. Access events and
/// metadata-only touches never change a listing.
pub fn classify(event: Event) -> Option<RawChange> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Create,
        EventKind::Remove(_) => ChangeKind::Remove,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
        EventKind::Modify(ModifyKind::Metadata(_)) => return None,
        EventKind::Modify(_) => ChangeKind::Modify,
        EventKind::Access(_) => return None,
        EventKind::Any | EventKind::Other => ChangeKind::Other,
    };
    if event.paths.is_empty() {
        return None;
    }
    Some(RawChange::new(kind, event.paths))
}

/// Recursive watch on the tree root, feeding a debouncer.
///
/// Events are recorded from notify's own thread. Stream errors are queued for
/// the owner to collect with [`poll_errors`](Self::poll_errors).
pub struct TreeWatcher {
    _watcher: RecommendedWatcher,
    errors: mpsc::Receiver<notify::Error>,
}

impl TreeWatcher {
    pub fn start(root: &Path, handle: DebounceHandle) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if let Some(change) = classify(event) {
                        handle.record(&change);
                    }
                }
                Err(e) => {
                    let _ = tx.send(e);
                }
            },
            Config::default(),
        )
        .map_err(|e| WatchError::Start {
            path: root.to_path_buf(),
            source: e,
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Start {
                path: root.to_path_buf(),
                source: e,
            })?;
        info!(root = %root.display(), "watching for changes");
        Ok(TreeWatcher {
            _watcher: watcher,
            errors: rx,
        })
    }

    /// Non-blocking drain of queued stream errors
    pub fn poll_errors(&self) -> Vec<WatchError> {
        let mut errors = Vec::new();
        while let Ok(e) = self.errors.try_recv() {
            warn!(error = %e, "watch stream error");
            errors.push(WatchError::Stream(e));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, MetadataKind, RenameMode};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut e = Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    #[test]
    fn access_and_metadata_are_ignored() {
        assert!(classify(event(EventKind::Access(AccessKind::Any), &["/r/a"])).is_none());
        assert!(
            classify(event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
                &["/r/a"]
            ))
            .is_none()
        );
    }

    #[test]
    fn rename_keeps_both_paths() {
        let change = classify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/r/src/old.txt", "/r/src/new.txt"],
        ))
        .unwrap();
        assert_eq!(change.kind, ChangeKind::Rename);
        assert_eq!(change.paths.len(), 2);
    }

    #[test]
    fn create_maps_to_create() {
        let change = classify(event(EventKind::Create(CreateKind::File), &["/r/a"])).unwrap();
        assert_eq!(change.kind, ChangeKind::Create);
    }

    #[test]
    fn pathless_events_are_dropped() {
        assert!(classify(event(EventKind::Create(CreateKind::Any), &[])).is_none());
    }
}
