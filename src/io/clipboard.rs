use std::env;

use tracing::debug;

use super::external::{argv, run_checked};
use super::tmux::in_tmux;

/// Desktop environment, as far as clipboard tooling is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Wsl,
    MacOs,
    Wayland,
    X11,
    /// No native clipboard tool to try; only the tmux buffer remains
    Headless,
}

impl Platform {
    /// Detect from the current process environment
    pub fn detect() -> Self {
        Self::detect_from(
            |key| env::var_os(key).is_some_and(|v| !v.is_empty()),
            cfg!(target_os = "macos"),
        )
    }

    /// Detection order: WSL, macOS, Wayland, X11
    pub fn detect_from(has_var: impl Fn(&str) -> bool, is_macos: bool) -> Self {
        if has_var("WSL_DISTRO_NAME") {
            Platform::Wsl
        } else if is_macos {
            Platform::MacOs
        } else if has_var("WAYLAND_DISPLAY") {
            Platform::Wayland
        } else if has_var("DISPLAY") {
            Platform::X11
        } else {
            Platform::Headless
        }
    }

    /// Native copy commands to try, in priority order
    pub fn mechanisms(self) -> Vec<Vec<String>> {
        match self {
            Platform::Wsl => vec![argv(&["clip.exe"])],
            Platform::MacOs => vec![argv(&["pbcopy"])],
            Platform::Wayland => vec![argv(&["wl-copy"])],
            Platform::X11 => vec![
                argv(&["xclip", "-selection", "clipboard"]),
                argv(&["xsel", "--clipboard", "--input"]),
            ],
            Platform::Headless => Vec::new(),
        }
    }
}

/// Something that can put text on a clipboard
pub trait Clipboard {
    /// Returns true if any mechanism accepted the text
    fn copy(&self, text: &str) -> bool;
}

/// Clipboard backed by the platform's command-line tools, with the tmux
/// paste buffer as the last resort
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    platform: Platform,
    in_tmux: bool,
}

impl SystemClipboard {
    pub fn new(platform: Platform, in_tmux: bool) -> Self {
        SystemClipboard { platform, in_tmux }
    }

    pub fn detect() -> Self {
        Self::new(Platform::detect(), in_tmux())
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::detect()
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> bool {
        let mut copied = false;
        for command in self.platform.mechanisms() {
            match run_checked(&command, text.as_bytes()) {
                Ok(()) => {
                    copied = true;
                    break;
                }
                Err(e) => debug!(error = %e, "clipboard mechanism failed"),
            }
        }

        // The tmux buffer is the fallback, and inside tmux it is always set
        // too so the text can be pasted into another pane.
        if !copied || self.in_tmux {
            let tmux = argv(&["tmux", "set-buffer", "--", text]);
            match run_checked(&tmux, b"") {
                Ok(()) => copied = true,
                Err(e) => debug!(error = %e, "tmux set-buffer failed"),
            }
        }
        copied
    }
}
