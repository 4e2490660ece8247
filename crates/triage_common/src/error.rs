//! Error types for nettriage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Session directory error at {path}: {source}")]
    Session {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error in {path}: {message}")]
    Config { path: String, message: String },

    #[error("Evidence record is not valid JSON: {0}")]
    Evidence(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;

/// Failure of a single remediation sub-action. Captured into the step's raw
/// artifact, never propagated out of the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("failed to start `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` exited with code {exit_code}")]
    NonZeroExit {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

impl ActionError {
    /// Full error detail as written to the raw artifact
    pub fn detail(&self) -> String {
        match self {
            ActionError::Spawn { .. } => self.to_string(),
            ActionError::NonZeroExit { stdout, stderr, .. } => {
                let mut out = self.to_string();
                if !stdout.trim().is_empty() {
                    out.push_str("\n--- stdout ---\n");
                    out.push_str(stdout.trim_end());
                }
                if !stderr.trim().is_empty() {
                    out.push_str("\n--- stderr ---\n");
                    out.push_str(stderr.trim_end());
                }
                out
            }
        }
    }
}
