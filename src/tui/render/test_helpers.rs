use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use tempfile::TempDir;

use crate::io::clipboard::Clipboard;
use crate::io::external::ExternalToolError;
use crate::io::ignore::{IgnoreCheck, IgnoreOverlay};
use crate::io::state::SessionStore;
use crate::model::Config;
use crate::tui::app::App;

/// Render into an in-memory buffer and return it
pub fn render_to_buffer<F>(w: u16, h: u16, f: F) -> Buffer
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();
    terminal.backend().buffer().clone()
}

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let buf = render_to_buffer(w, h, f);
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Clipboard that remembers what it was given
#[derive(Clone, Default)]
pub struct RecordingClipboard {
    copied: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl RecordingClipboard {
    pub fn failing() -> Self {
        RecordingClipboard {
            fail: true,
            ..Default::default()
        }
    }

    pub fn copied(&self) -> Vec<String> {
        self.copied.borrow().clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn copy(&self, text: &str) -> bool {
        if self.fail {
            return false;
        }
        self.copied.borrow_mut().push(text.to_string());
        true
    }
}

/// Ignore check that never matches
pub struct NoIgnores;

impl IgnoreCheck for NoIgnores {
    fn check(&self, _paths: &[PathBuf]) -> Result<HashSet<PathBuf>, ExternalToolError> {
        Ok(HashSet::new())
    }
}

/// Ignore check matching on file name
pub struct NameIgnores(pub Vec<String>);

impl IgnoreCheck for NameIgnores {
    fn check(&self, paths: &[PathBuf]) -> Result<HashSet<PathBuf>, ExternalToolError> {
        Ok(paths
            .iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.0.iter().any(|i| i == n))
            })
            .cloned()
            .collect())
    }
}

/// A directory tree on disk plus a separate directory for session state
pub struct Fixture {
    tree: TempDir,
    data: TempDir,
}

impl Fixture {
    pub fn new(dirs: &[&str], files: &[&str]) -> Self {
        let tree = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(tree.path().join(dir)).unwrap();
        }
        for file in files {
            let path = tree.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, "").unwrap();
        }
        Fixture {
            tree,
            data: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.tree.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.tree.path().join(rel)
    }

    pub fn state_path(&self) -> PathBuf {
        self.data.path().join("state.json")
    }

    fn build(&self, clipboard: Box<dyn Clipboard>, ignore: IgnoreOverlay) -> App {
        App::open(
            self.root(),
            &Config::default(),
            SessionStore::new(self.state_path()),
            clipboard,
            ignore,
        )
        .unwrap()
    }

    pub fn app(&self) -> App {
        self.build(
            Box::new(RecordingClipboard::default()),
            IgnoreOverlay::spawn(NoIgnores),
        )
    }

    pub fn app_with_clipboard(&self, clipboard: RecordingClipboard) -> App {
        self.build(Box::new(clipboard), IgnoreOverlay::spawn(NoIgnores))
    }

    pub fn app_with_ignores(&self, names: &[&str]) -> App {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.build(
            Box::new(RecordingClipboard::default()),
            IgnoreOverlay::spawn(NameIgnores(names)),
        )
    }
}

/// Poll `done` until it returns true, failing after a few seconds
pub fn wait_until(mut done: impl FnMut() -> bool) {
    let start = Instant::now();
    while !done() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "condition not reached in time"
        );
        std::thread::sleep(Duration::from_millis(5));
    }
}
