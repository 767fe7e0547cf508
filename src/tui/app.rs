use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use signal_hook::consts::SIGTERM;
use tracing::{info, warn};

use crate::cli::commands::Cli;
use crate::io::clipboard::{Clipboard, SystemClipboard};
use crate::io::config_io::load_config;
use crate::io::debounce::{ChangeDebouncer, NoiseFilter, flush};
use crate::io::ignore::{GitCheckIgnore, IgnoreOverlay, merge};
use crate::io::launcher::{editor_command, launch, viewer_command};
use crate::io::state::{SessionStore, default_state_path};
use crate::io::tmux::PaneMarker;
use crate::io::watcher::{TreeWatcher, WatchError};
use crate::model::{Config, LoadError, NodeId, NodeKind, ToolsConfig, TreeModel};
use crate::ops::restore::CascadeRestore;

use super::input;
use super::render;
use super::theme::Theme;

/// Upper bound on how long the loop sleeps waiting for input
const IDLE_TICK: Duration = Duration::from_millis(250);

/// Fatal startup conditions. Everything after startup degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("cannot open {path}: {source}")]
    MissingRoot { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Root(#[from] LoadError),
}

/// Message shown in the footer until the next key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Which external program to hand a file to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
    View,
    Edit,
}

/// A viewer/editor launch waiting for the loop to suspend the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLaunch {
    pub kind: LaunchKind,
    pub path: PathBuf,
}

/// Main application state
pub struct App {
    pub root: PathBuf,
    pub tree: TreeModel,
    pub debouncer: ChangeDebouncer,
    watcher: Option<TreeWatcher>,
    /// The watch has already been re-established once
    watch_restarted: bool,
    ignore: IgnoreOverlay,
    store: SessionStore,
    clipboard: Box<dyn Clipboard>,
    pub tools: ToolsConfig,
    pub theme: Theme,
    pub show_key_hints: bool,
    pub status: Option<StatusMessage>,
    /// First visible row
    pub scroll_offset: usize,
    /// Rows in the tree area at the last draw, used for paging
    pub page_height: usize,
    pub pending_launch: Option<PendingLaunch>,
    /// Base for "copy relative path"
    pub cwd: PathBuf,
    save_interval: Duration,
    last_save: Instant,
    pub should_quit: bool,
    /// Set from the SIGTERM handler; the loop then exits like a normal quit
    terminated: Arc<AtomicBool>,
}

impl App {
    /// Open the tree at `root`, list it, and re-apply the saved session
    pub fn open(
        root: &Path,
        config: &Config,
        store: SessionStore,
        clipboard: Box<dyn Clipboard>,
        ignore: IgnoreOverlay,
    ) -> Result<Self, StartupError> {
        let mut tree = TreeModel::open(root)?;
        let noise = NoiseFilter::new(root, &config.watch.ignore);
        let delay = Duration::from_millis(config.watch.debounce_ms);
        let debouncer = ChangeDebouncer::new(delay, noise);

        let mut status = None;
        if let Err(e) = tree.load_children(tree.root()) {
            warn!(error = %e, "could not list root");
            status = Some(StatusMessage {
                text: e.to_string(),
                is_error: true,
            });
        }
        ignore.request_for(&tree, tree.root());

        let mut restore = CascadeRestore::new(store.restore(root));
        if restore.is_pending() {
            let report = restore.run(&mut tree);
            for &dir in &report.expanded {
                ignore.request_for(&tree, dir);
            }
            if let Some(e) = report.failures.first() {
                status = Some(StatusMessage {
                    text: e.to_string(),
                    is_error: true,
                });
            }
        }

        Ok(App {
            root: root.to_path_buf(),
            tree,
            debouncer,
            watcher: None,
            watch_restarted: false,
            ignore,
            store,
            clipboard,
            tools: config.tools.clone(),
            theme: Theme::from_config(&config.ui),
            show_key_hints: config.ui.show_key_hints,
            status,
            scroll_offset: 0,
            page_height: 1,
            pending_launch: None,
            cwd: std::env::current_dir().unwrap_or_else(|_| root.to_path_buf()),
            save_interval: Duration::from_secs(config.session.save_interval_secs.max(1)),
            last_save: Instant::now(),
            should_quit: false,
            terminated: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }

    /// Start the recursive watch. A failure is retried once, after which the
    /// tree stays static.
    pub fn start_watch(&mut self) {
        match TreeWatcher::start(&self.root, self.debouncer.handle()) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => self.watch_failed(&e),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Collect stream errors from the running watch
    fn check_watch(&mut self) {
        let error = self
            .watcher
            .as_ref()
            .and_then(|w| w.poll_errors().into_iter().next());
        if let Some(e) = error {
            self.watch_failed(&e);
        }
    }

    /// Re-establish a failed watch once; after that, keep going without it
    fn watch_failed(&mut self, error: &WatchError) {
        self.watcher = None;
        if self.watch_restarted {
            warn!(error = %error, "live sync disabled");
            self.notify_error(format!("{}; live sync disabled", error));
            return;
        }
        self.watch_restarted = true;
        info!(error = %error, "re-establishing watch");
        self.start_watch();
    }

    /// Expand or collapse the cursor directory
    pub fn toggle_cursor(&mut self) {
        let cursor = self.tree.cursor();
        let result = self.tree.toggle(cursor);
        if self.tree.get(cursor).is_some_and(|n| n.expanded && n.is_loaded()) {
            self.ignore.request_for(&self.tree, cursor);
        }
        if let Err(e) = result {
            self.notify_error(e.to_string());
        }
    }

    /// Queue the cursor file for the viewer or editor. Directories are skipped.
    pub fn request_launch(&mut self, kind: LaunchKind) {
        if let Some(node) = self.tree.cursor_node()
            && node.kind == NodeKind::File
        {
            self.pending_launch = Some(PendingLaunch {
                kind,
                path: node.path.clone(),
            });
        }
    }

    /// Copy the cursor path, relative to the working directory or absolute
    pub fn copy_cursor_path(&mut self, absolute: bool) {
        let Some(path) = self.tree.cursor_node().map(|n| n.path.clone()) else {
            return;
        };
        let text = if absolute {
            absolute_text(&path)
        } else {
            relative_text(&path, &self.cwd)
        };
        if self.clipboard.copy(&text) {
            self.notify(format!("Copied: {}", text));
        } else {
            self.notify_error("Copy failed: no clipboard available");
        }
    }

    /// Periodic work between key presses: watch health, debounced reloads,
    /// finished ignore checks, and the periodic session save.
    pub fn tick(&mut self, now: Instant) {
        self.check_watch();

        if let Some(dirs) = self.debouncer.take_due(now) {
            let report = flush(&mut self.tree, &dirs);
            for dir in &report.reloaded {
                if let Some(id) = self.tree.find(dir) {
                    self.ignore.request_for(&self.tree, id);
                }
            }
            if let Some(e) = report.failures.first() {
                self.notify_error(e.to_string());
            }
        }

        for outcome in self.ignore.poll() {
            merge(&mut self.tree, &outcome);
        }

        if now.duration_since(self.last_save) >= self.save_interval {
            self.save_session();
            self.last_save = now;
        }
    }

    /// How long the loop may block on input before `tick` has work to do
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        match self.debouncer.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(IDLE_TICK),
            None => IDLE_TICK,
        }
    }

    /// Write the session record. Failures are logged; the session goes on.
    pub fn save_session(&self) {
        if let Err(e) = self.store.save(&self.root, &self.tree) {
            warn!(error = %e, "could not save session state");
        }
    }

    /// Node id at the cursor
    pub fn cursor(&self) -> NodeId {
        self.tree.cursor()
    }
}

/// Path relative to `cwd` when it lies below it, else the path itself
pub fn relative_text(path: &Path, cwd: &Path) -> String {
    match path.strip_prefix(cwd) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
        Ok(_) => ".".to_string(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Fully resolved path, falling back to the path as given
pub fn absolute_text(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Turn SIGTERM into a normal exit so state is saved and the pane marker removed
fn watch_sigterm(flag: &Arc<AtomicBool>) {
    if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(flag)) {
        warn!(error = %e, "could not install SIGTERM handler");
    }
}

/// Run the TUI application
pub fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let root = std::fs::canonicalize(&cli.directory).map_err(|e| StartupError::MissingRoot {
        path: cli.directory.clone(),
        source: e,
    })?;
    let config = load_config(cli.config.as_deref());
    let state_path = cli
        .state_file
        .clone()
        .or_else(|| config.session.state_file.clone())
        .unwrap_or_else(default_state_path);
    let checker = GitCheckIgnore::new(
        &root,
        Duration::from_millis(config.tools.ignore_timeout_ms),
    );

    let mut app = App::open(
        &root,
        &config,
        SessionStore::new(state_path),
        Box::new(SystemClipboard::detect()),
        IgnoreOverlay::spawn(checker),
    )?;
    if !cli.no_watch {
        app.start_watch();
    }
    info!(root = %root.display(), watching = app.is_watching(), "session started");

    let _marker = PaneMarker::create();
    watch_sigterm(&app.terminated);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app);

    app.save_session();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        // A signal can interrupt the wait; the flag is checked below
        let ready = match event::poll(app.poll_timeout(Instant::now())) {
            Ok(ready) => ready,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => false,
            Err(e) => return Err(e.into()),
        };
        if ready
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            input::handle_key(app, key);
        }

        if let Some(pending) = app.pending_launch.take() {
            run_launch(terminal, app, &pending)?;
        }

        app.tick(Instant::now());

        if app.should_quit || app.terminated.load(Ordering::SeqCst) {
            break;
        }
    }
    Ok(())
}

/// Hand the terminal to the viewer or editor and take it back afterwards.
/// The watcher keeps queueing changes meanwhile.
fn run_launch(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    pending: &PendingLaunch,
) -> io::Result<()> {
    let command = match pending.kind {
        LaunchKind::View => viewer_command(&app.tools),
        LaunchKind::Edit => editor_command(&app.tools),
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    let result = launch(&command, &pending.path);
    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()?;

    match result {
        Ok(status) if !status.success() => {
            warn!(program = ?command.first(), %status, "external program failed");
        }
        Ok(_) => {}
        Err(e) => app.notify_error(e.to_string()),
    }
    Ok(())
}
