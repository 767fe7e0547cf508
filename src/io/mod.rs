pub mod clipboard;
pub mod config_io;
pub mod debounce;
pub mod external;
pub mod ignore;
pub mod launcher;
pub mod lock;
pub mod state;
pub mod tmux;
pub mod watcher;
