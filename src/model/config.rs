use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay after the last filesystem event before reloading
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Directory names whose events never trigger a reload
    #[serde(default = "default_watch_ignore")]
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            debounce_ms: default_debounce_ms(),
            ignore: default_watch_ignore(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_watch_ignore() -> Vec<String> {
    [
        ".git",
        "__pycache__",
        ".mypy_cache",
        ".ruff_cache",
        "node_modules",
        "target",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
    /// Override for the session state file location
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            save_interval_secs: default_save_interval_secs(),
            state_file: None,
        }
    }
}

fn default_save_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Viewer command line, e.g. `["glow", "-p"]`. Empty = auto-detect.
    #[serde(default)]
    pub viewer: Vec<String>,
    /// Editor command line. Empty = `$TREE_COPY_EDITOR`, then nano, then vi.
    #[serde(default)]
    pub editor: Vec<String>,
    #[serde(default = "default_ignore_timeout_ms")]
    pub ignore_timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            viewer: Vec::new(),
            editor: Vec::new(),
            ignore_timeout_ms: default_ignore_timeout_ms(),
        }
    }
}

fn default_ignore_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Hex color overrides keyed by theme slot (e.g. `dim = "#585858"`)
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub show_key_hints: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            colors: HashMap::new(),
            show_key_hints: true,
        }
    }
}

fn default_true() -> bool {
    true
}
