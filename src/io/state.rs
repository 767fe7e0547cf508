use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::model::{SessionDocument, SessionState, TreeModel};

use super::lock::{FileLock, LockError};

/// Error type for the session state file
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not serialize session state: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Directory for persistent data, respecting XDG_DATA_HOME
pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local").join("share"))
        .join("tree-copy")
}

/// Default location of the session state file
pub fn default_state_path() -> PathBuf {
    data_dir().join("state.json")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Snapshot the expansion and cursor state of `tree`
pub fn capture(tree: &TreeModel) -> SessionState {
    SessionState {
        expanded: tree
            .expanded_paths()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
        cursor: tree
            .cursor_node()
            .map(|n| n.path.to_string_lossy().into_owned()),
    }
}

/// Per-root session records in one shared JSON document
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        SessionStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Read the whole document. A missing file is an empty document.
    pub fn read_document(&self) -> Result<SessionDocument, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SessionDocument::new()),
            Err(e) => {
                return Err(PersistenceError::ReadError {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        serde_json::from_str(&content).map_err(|e| PersistenceError::ParseError {
            path: self.path.clone(),
            source: e,
        })
    }

    /// The saved record for `root`. Absent, unreadable or corrupt state all
    /// come back as `None`.
    pub fn restore(&self, root: &Path) -> Option<SessionState> {
        match self.read_document() {
            Ok(mut doc) => doc.shift_remove(&*root.to_string_lossy()),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session state");
                None
            }
        }
    }

    /// Record the tree's current state under `root`
    pub fn save(&self, root: &Path, tree: &TreeModel) -> Result<(), PersistenceError> {
        self.save_state(root, capture(tree))
    }

    /// Merge `state` into the document under `root`, leaving other roots'
    /// records untouched. A corrupt document is replaced.
    pub fn save_state(&self, root: &Path, state: SessionState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::WriteError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let _lock = FileLock::acquire_default(&self.lock_path())?;

        let mut doc = match self.read_document() {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "overwriting unreadable session state");
                SessionDocument::new()
            }
        };
        doc.insert(root.to_string_lossy().into_owned(), state);

        let content = serde_json::to_string_pretty(&doc)?;
        atomic_write(&self.path, content.as_bytes()).map_err(|e| PersistenceError::WriteError {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(path = %self.path.display(), roots = doc.len(), "saved session state");
        Ok(())
    }
}
