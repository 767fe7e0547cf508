//! Background ignore-status overlay.
//!
//! Listing a directory never waits on git. After a load, the owner sends the
//! child paths to a worker thread, which asks an [`IgnoreCheck`] which of them
//! are ignored. Results come back over a channel and are merged into the tree
//! on the owner's thread.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::{IgnoreStatus, NodeId, TreeModel};

use super::external::{ExternalToolError, run_with_input};

/// Decides which paths are ignored by version control
pub trait IgnoreCheck: Send + 'static {
    fn check(&self, paths: &[PathBuf]) -> Result<HashSet<PathBuf>, ExternalToolError>;
}

/// `git check-ignore --stdin` run in the tree root
#[derive(Debug, Clone)]
pub struct GitCheckIgnore {
    root: PathBuf,
    timeout: Duration,
}

impl GitCheckIgnore {
    pub fn new(root: &Path, timeout: Duration) -> Self {
        GitCheckIgnore {
            root: root.to_path_buf(),
            timeout,
        }
    }
}

impl IgnoreCheck for GitCheckIgnore {
    fn check(&self, paths: &[PathBuf]) -> Result<HashSet<PathBuf>, ExternalToolError> {
        if paths.is_empty() {
            return Ok(HashSet::new());
        }
        let mut input = Vec::new();
        for path in paths {
            input.extend_from_slice(&path_bytes(path));
            input.push(0);
        }
        let argv = vec![
            "git".to_string(),
            "-C".to_string(),
            self.root.to_string_lossy().into_owned(),
            "check-ignore".to_string(),
            "--stdin".to_string(),
            "-z".to_string(),
        ];
        let output = run_with_input(&argv, &input, None, Some(self.timeout))?;
        // 0: some paths ignored, 1: none ignored, anything else: not a repo or
        // a real failure
        match output.status.code() {
            Some(0) | Some(1) => Ok(parse_ignored(&output.stdout)),
            _ => Err(ExternalToolError::Failed {
                program: "git".to_string(),
                status: output.status,
            }),
        }
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Paths from `git check-ignore -z` output: NUL-terminated and unquoted, so
/// names keep their exact bytes
pub fn parse_ignored(stdout: &[u8]) -> HashSet<PathBuf> {
    stdout
        .split(|&b| b == 0)
        .filter(|entry| !entry.is_empty())
        .map(path_from_bytes)
        .collect()
}

#[derive(Debug)]
struct IgnoreRequest {
    dir: PathBuf,
    paths: Vec<PathBuf>,
}

/// Result of checking one directory's children
#[derive(Debug)]
pub struct IgnoreOutcome {
    pub dir: PathBuf,
    pub paths: Vec<PathBuf>,
    pub result: Result<HashSet<PathBuf>, ExternalToolError>,
}

/// Owner-side handle to the ignore worker
pub struct IgnoreOverlay {
    requests: Sender<IgnoreRequest>,
    outcomes: Receiver<IgnoreOutcome>,
}

impl IgnoreOverlay {
    /// Start the worker thread. It exits when the overlay is dropped.
    pub fn spawn<C: IgnoreCheck>(checker: C) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<IgnoreRequest>();
        let (out_tx, out_rx) = mpsc::channel();
        thread::spawn(move || {
            for request in req_rx {
                let result = checker.check(&request.paths);
                let outcome = IgnoreOutcome {
                    dir: request.dir,
                    paths: request.paths,
                    result,
                };
                if out_tx.send(outcome).is_err() {
                    break;
                }
            }
        });
        IgnoreOverlay {
            requests: req_tx,
            outcomes: out_rx,
        }
    }

    /// Queue a check of `dir`'s current children
    pub fn request(&self, dir: &Path, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        let request = IgnoreRequest {
            dir: dir.to_path_buf(),
            paths,
        };
        if self.requests.send(request).is_err() {
            warn!("ignore worker has stopped");
        }
    }

    /// Queue a check of the children of the tree node `dir`
    pub fn request_for(&self, tree: &TreeModel, dir: NodeId) {
        let Some(path) = tree.path_of(dir) else {
            return;
        };
        let paths = tree
            .children(dir)
            .iter()
            .filter_map(|&child| tree.path_of(child).map(Path::to_path_buf))
            .collect();
        self.request(path, paths);
    }

    /// Non-blocking drain of finished checks
    pub fn poll(&self) -> Vec<IgnoreOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.outcomes.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Apply a finished check to the tree. Paths that have since disappeared are
/// skipped, and a failed check leaves every status unchanged. Returns how many
/// nodes were updated.
pub fn merge(tree: &mut TreeModel, outcome: &IgnoreOutcome) -> usize {
    let ignored = match &outcome.result {
        Ok(ignored) => ignored,
        Err(e) => {
            debug!(dir = %outcome.dir.display(), error = %e, "ignore check failed");
            return 0;
        }
    };
    let mut updated = 0;
    for path in &outcome.paths {
        let Some(id) = tree.find(path) else {
            continue;
        };
        let status = if ignored.contains(path) {
            IgnoreStatus::Ignored
        } else {
            IgnoreStatus::NotIgnored
        };
        tree.set_ignored(id, status);
        updated += 1;
    }
    updated
}
