//! Toolchain invoker (spec.md §4.3).
//!
//! A uniform wrapper around Go-toolchain subprocess calls. Every invocation
//! gets an explicit environment (never inheriting beyond `PATH`) and fails
//! with a `ToolchainError` on non-zero exit. The download invoker
//! specializes this with deterministic exponential backoff.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Runs `go` subcommands with an explicit, minimal environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolchainInvoker;

impl ToolchainInvoker {
    pub fn new() -> Self {
        ToolchainInvoker
    }

    /// Run `argv` in `cwd` with exactly `env` plus the ambient `PATH`.
    ///
    /// Returns stdout on success (exit code 0). On non-zero exit, fails with
    /// `ToolchainError` carrying the argv, exit code, and captured stderr.
    pub fn run(&self, argv: &[&str], cwd: &Path, env: &[(String, String)]) -> Result<String> {
        debug!(argv = ?argv, cwd = %cwd.display(), "running go toolchain command");

        let mut cmd = Command::new(argv[0]);
        cmd.args(&argv[1..]).current_dir(cwd);

        cmd.env_clear();
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd.output().map_err(|e| Error::ToolchainError {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            exit_code: None,
            attempts: None,
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(argv = ?argv, code = ?output.status.code(), "go toolchain command exited non-zero");
            return Err(Error::ToolchainError {
                argv: argv.iter().map(|s| s.to_string()).collect(),
                exit_code: output.status.code(),
                attempts: None,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Specializes [`ToolchainInvoker`] with deterministic exponential backoff
/// (1s, 2s, 4s, ... no jitter) for commands that hit the network.
///
/// Network failures are not distinguished from other toolchain errors,
/// because the Go toolchain itself does not distinguish them (spec.md §4.3).
pub struct DownloadInvoker {
    inner: ToolchainInvoker,
    max_tries: u32,
}

impl DownloadInvoker {
    pub fn new(max_tries: u32) -> Self {
        DownloadInvoker {
            inner: ToolchainInvoker::new(),
            max_tries: max_tries.max(1),
        }
    }

    pub fn run(&self, argv: &[&str], cwd: &Path, env: &[(String, String)]) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.inner.run(argv, cwd, env) {
                Ok(out) => return Ok(out),
                Err(err) if attempt >= self.max_tries => {
                    let argv_owned: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
                    return Err(Error::ToolchainError {
                        argv: argv_owned,
                        exit_code: match &err {
                            Error::ToolchainError { exit_code, .. } => *exit_code,
                            _ => None,
                        },
                        attempts: Some(attempt),
                        stderr: match &err {
                            Error::ToolchainError { stderr, .. } => stderr.clone(),
                            _ => String::new(),
                        },
                    });
                }
                Err(_) => {
                    let delay = Duration::from_secs(1u64 << (attempt - 1));
                    warn!(attempt, delay_secs = delay.as_secs(), "retrying gomod download command");
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

/// Log the toolchain's version once per request, so a misbehaving `go`
/// install is visible in logs without re-running anything (SPEC_FULL.md §11).
pub fn go_version(invoker: &ToolchainInvoker, cwd: &Path) -> Result<String> {
    let out = invoker.run(&["go", "version"], cwd, &[])?;
    debug!(version = %out.trim(), "go toolchain version");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_returns_stdout() {
        let invoker = ToolchainInvoker::new();
        let cwd = std::env::current_dir().unwrap();
        let out = invoker.run(&["echo", "hello"], &cwd, &[]).unwrap();
        assert!(out.contains("hello"));
    }

    #[test]
    fn nonzero_exit_is_toolchain_error() {
        let invoker = ToolchainInvoker::new();
        let cwd = std::env::current_dir().unwrap();
        let err = invoker.run(&["false"], &cwd, &[]).unwrap_err();
        assert!(matches!(err, Error::ToolchainError { .. }));
    }

    #[test]
    fn download_invoker_reports_total_attempts_on_final_failure() {
        let invoker = DownloadInvoker::new(2);
        let cwd = std::env::current_dir().unwrap();
        let err = invoker.run(&["false"], &cwd, &[]).unwrap_err();
        match err {
            Error::ToolchainError { attempts, .. } => assert_eq!(attempts, Some(2)),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
