//! Command execution layer
//!
//! Runs one external program and captures exit code, stdout, stderr and
//! duration without interpreting the output. Every system-changing action
//! and every OS query goes through a [`CommandRunner`], so tests can swap
//! in a scripted runner.

use crate::error::ActionError;
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::debug;

/// Maximum output length to capture per stream
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Run a PowerShell snippet non-interactively. Errors are made
    /// terminating so a failing cmdlet shows up as a non-zero exit.
    pub fn powershell(script: &str) -> Self {
        let script = format!("$ErrorActionPreference = 'Stop'; {}", script);
        Self::new(
            "powershell.exe",
            &[
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                &script,
            ],
        )
    }

    /// Command line as shown in logs
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCapture {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandCapture {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Text written to raw artifacts
    pub fn render(&self) -> String {
        let mut out = format!("> {}\n(exit code {})\n", self.command, self.exit_code);
        if !self.stdout.is_empty() {
            out.push_str(self.stdout.trim_end());
            out.push('\n');
        }
        if !self.stderr.trim().is_empty() {
            out.push_str("--- stderr ---\n");
            out.push_str(self.stderr.trim_end());
            out.push('\n');
        }
        out
    }

    /// Convert a non-zero exit into an [`ActionError`]
    pub fn into_result(self) -> Result<CommandCapture, ActionError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ActionError::NonZeroExit {
                command: self.command,
                exit_code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

/// Executes commands against the live system
pub trait CommandRunner {
    /// Run to completion. `Err` only when the program could not be started;
    /// a non-zero exit is still `Ok` with the exit code captured.
    fn run(&self, spec: &CommandSpec) -> Result<CommandCapture, ActionError>;

    /// Block for `duration`. Overridden by test runners.
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runner backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandCapture, ActionError> {
        let start = Instant::now();
        let command = spec.display();
        debug!(command = %command, "running command");

        let output = Command::new(&spec.program)
            .args(&spec.args)
            .output()
            .map_err(|e| ActionError::Spawn {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let (stdout, _) = truncate_output(&output.stdout);
        let (stderr, _) = truncate_output(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(command = %command, exit_code, duration_ms, "command finished");

        Ok(CommandCapture {
            command,
            exit_code,
            stdout,
            stderr,
            duration_ms,
        })
    }
}

/// Truncate output to [`MAX_OUTPUT_BYTES`], keeping UTF-8 boundaries
fn truncate_output(bytes: &[u8]) -> (String, bool) {
    if bytes.len() <= MAX_OUTPUT_BYTES {
        return (String::from_utf8_lossy(bytes).to_string(), false);
    }

    let mut end = MAX_OUTPUT_BYTES;
    while end > 0 && (bytes[end] & 0b1100_0000) == 0b1000_0000 {
        end -= 1;
    }

    let mut text = String::from_utf8_lossy(&bytes[..end]).to_string();
    text.push_str("\n... (output truncated)");
    (text, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_args() {
        let spec = CommandSpec::new("ipconfig", &["/flushdns"]);
        assert_eq!(spec.display(), "ipconfig /flushdns");
        assert_eq!(CommandSpec::new("hostname", &[]).display(), "hostname");
    }

    #[test]
    fn test_powershell_wraps_script() {
        let spec = CommandSpec::powershell("Restart-Service -Name Dnscache -Force");
        assert_eq!(spec.program, "powershell.exe");
        assert_eq!(
            spec.args.last().map(String::as_str),
            Some("$ErrorActionPreference = 'Stop'; Restart-Service -Name Dnscache -Force")
        );
        assert!(spec.args.contains(&"-NonInteractive".to_string()));
    }

    #[test]
    fn test_into_result_non_zero() {
        let capture = CommandCapture {
            command: "ipconfig /renew".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "No adapter is in the state permissible".to_string(),
            duration_ms: 4,
        };
        match capture.into_result() {
            Err(ActionError::NonZeroExit { exit_code, .. }) => assert_eq!(exit_code, 1),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_render_includes_command_and_output() {
        let capture = CommandCapture {
            command: "ipconfig /flushdns".to_string(),
            exit_code: 0,
            stdout: "Successfully flushed the DNS Resolver Cache.\n".to_string(),
            stderr: String::new(),
            duration_ms: 12,
        };
        let text = capture.render();
        assert!(text.starts_with("> ipconfig /flushdns\n(exit code 0)\n"));
        assert!(text.contains("Successfully flushed"));
        assert!(!text.contains("stderr"));
    }

    #[test]
    fn test_truncate_output_short() {
        let (text, truncated) = truncate_output(b"hello");
        assert_eq!(text, "hello");
        assert!(!truncated);
    }

    #[test]
    fn test_truncate_output_long() {
        let big = vec![b'a'; MAX_OUTPUT_BYTES + 100];
        let (text, truncated) = truncate_output(&big);
        assert!(truncated);
        assert!(text.ends_with("(output truncated)"));
    }
}
