use std::path::Path;
use std::process::{Command, ExitStatus};

use crate::model::ToolsConfig;

use super::external::{ExternalToolError, argv, find_in_path};

/// Viewer command line: configured, else `glow -p` when installed, else `less`
pub fn viewer_command(tools: &ToolsConfig) -> Vec<String> {
    viewer_command_with(tools, |p| find_in_path(p).is_some())
}

fn viewer_command_with(tools: &ToolsConfig, installed: impl Fn(&str) -> bool) -> Vec<String> {
    if !tools.viewer.is_empty() {
        return tools.viewer.clone();
    }
    if installed("glow") {
        argv(&["glow", "-p"])
    } else {
        argv(&["less"])
    }
}

/// Editor command line: configured, else `$TREE_COPY_EDITOR`, else nano,
/// else vi
pub fn editor_command(tools: &ToolsConfig) -> Vec<String> {
    let env_override = std::env::var("TREE_COPY_EDITOR").ok();
    editor_command_with(tools, env_override.as_deref(), |p| find_in_path(p).is_some())
}

fn editor_command_with(
    tools: &ToolsConfig,
    env_override: Option<&str>,
    installed: impl Fn(&str) -> bool,
) -> Vec<String> {
    if !tools.editor.is_empty() {
        return tools.editor.clone();
    }
    if let Some(custom) = env_override {
        let parts: Vec<String> = custom.split_whitespace().map(String::from).collect();
        if !parts.is_empty() {
            return parts;
        }
    }
    ["nano", "vi"]
        .into_iter()
        .find(|&ed| installed(ed))
        .map_or_else(|| argv(&["vi"]), |ed| argv(&[ed]))
}

/// Run `command` on `path` with the terminal inherited, blocking until it exits
pub fn launch(command: &[String], path: &Path) -> Result<ExitStatus, ExternalToolError> {
    let (program, args) = command.split_first().ok_or(ExternalToolError::EmptyCommand)?;
    Command::new(program)
        .args(args)
        .arg(path)
        .status()
        .map_err(|e| ExternalToolError::Spawn {
            program: program.clone(),
            source: e,
        })
}
