//! Integration tests for the `tree-copy` binary.
//!
//! Only startup paths that exit before the terminal UI takes over are
//! exercised here.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str], data_home: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tree-copy"))
        .args(args)
        .env("XDG_DATA_HOME", data_home)
        .env("XDG_CONFIG_HOME", data_home)
        .output()
        .expect("failed to run tree-copy")
}

#[test]
fn missing_root_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    let output = run(&[missing.to_str().unwrap()], tmp.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: "), "stderr: {}", stderr);
}

#[test]
fn file_root_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("file.txt");
    std::fs::write(&file, "").unwrap();
    let output = run(&[file.to_str().unwrap(), "--no-watch"], tmp.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a directory"), "stderr: {}", stderr);
}

#[test]
fn help_lists_flags() {
    let tmp = TempDir::new().unwrap();
    let output = run(&["--help"], tmp.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--no-watch", "--state-file", "--config"] {
        assert!(stdout.contains(flag), "missing {} in help", flag);
    }
}
