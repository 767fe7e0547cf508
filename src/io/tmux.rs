use std::env;
use std::fs;
use std::path::PathBuf;

use super::external::{ExternalToolError, argv, run_checked};

/// Whether we are running inside a tmux client
pub fn in_tmux() -> bool {
    env::var_os("TMUX").is_some()
}

/// Toggle zoom on the current tmux pane. Returns false outside tmux.
pub fn zoom_pane() -> Result<bool, ExternalToolError> {
    if !in_tmux() {
        return Ok(false);
    }
    run_checked(&argv(&["tmux", "resize-pane", "-Z"]), b"")?;
    Ok(true)
}

/// Marker file announcing that a tree sidebar lives in this tmux pane.
///
/// Created at startup, removed when dropped.
pub struct PaneMarker {
    path: PathBuf,
}

impl PaneMarker {
    /// Marker path for a pane id such as `%3`
    pub fn path_for(pane: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/tree-copy-{}", pane))
    }

    /// Create the marker for `$TMUX_PANE`, if set
    pub fn create() -> Option<Self> {
        let pane = env::var("TMUX_PANE").ok()?;
        Self::create_at(Self::path_for(&pane))
    }

    pub fn create_at(path: PathBuf) -> Option<Self> {
        fs::write(&path, b"").ok()?;
        Some(PaneMarker { path })
    }
}

impl Drop for PaneMarker {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
