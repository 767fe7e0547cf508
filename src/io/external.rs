use std::env;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Error type for helper programs (git, clipboard tools, tmux, viewer/editor).
///
/// Callers degrade on this error; it never ends the session.
#[derive(Debug, thiserror::Error)]
pub enum ExternalToolError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("{program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

/// Captured result of a helper run
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
}

/// Run `argv` with `input` on stdin and capture stdout.
///
/// With a `timeout`, the child is killed once it elapses. A non-zero exit is
/// NOT an error here; callers decide which codes mean failure.
pub fn run_with_input(
    argv: &[String],
    input: &[u8],
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<ToolOutput, ExternalToolError> {
    let (program, args) = argv.split_first().ok_or(ExternalToolError::EmptyCommand)?;
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let mut child = command.spawn().map_err(|e| ExternalToolError::Spawn {
        program: program.clone(),
        source: e,
    })?;

    // Feed stdin and drain stdout on helper threads so neither pipe can fill
    // up and stall the child while we wait on it.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        thread::spawn(move || {
            let _ = stdin.write_all(&input);
        })
    });
    let reader = child.stdout.take().map(|mut stdout| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        })
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if let Some(limit) = timeout
                    && start.elapsed() >= limit
                {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExternalToolError::Timeout {
                        program: program.clone(),
                        timeout: limit,
                    });
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                return Err(ExternalToolError::Io {
                    program: program.clone(),
                    source: e,
                });
            }
        }
    };

    if let Some(handle) = writer {
        let _ = handle.join();
    }
    let stdout = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Ok(ToolOutput { status, stdout })
}

/// Run `argv` with `input` on stdin; success means exit status 0
pub fn run_checked(argv: &[String], input: &[u8]) -> Result<(), ExternalToolError> {
    let output = run_with_input(argv, input, None, None)?;
    if output.status.success() {
        Ok(())
    } else {
        Err(ExternalToolError::Failed {
            program: argv.first().cloned().unwrap_or_default(),
            status: output.status,
        })
    }
}

/// Locate an executable on `$PATH`
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Build an owned argv from string slices
pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
