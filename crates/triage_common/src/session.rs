//! Diagnostic session log
//!
//! One timestamped directory per run:
//!
//! ```text
//! <root>/summary.txt        orchestrator timeline
//! <root>/collect.txt        collector log
//! <root>/reachability.txt   classifier log + verdict line
//! <root>/fix.txt            remediation log
//! <root>/raw/<name>.txt     raw command/probe captures
//! ```
//!
//! Log files are opened per write in append mode and closed right after, so
//! nothing holds a handle past the call.

use crate::classifier::Verdict;
use crate::error::{Result, TriageError};
use chrono::{Local, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of every session directory name
pub const SESSION_DIR_PREFIX: &str = "NetDiag_";

/// Name of the raw capture subdirectory
pub const RAW_DIR: &str = "raw";

/// The session text logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLog {
    Summary,
    Collect,
    Reachability,
    Fix,
}

impl SessionLog {
    pub fn file_name(&self) -> &'static str {
        match self {
            SessionLog::Summary => "summary.txt",
            SessionLog::Collect => "collect.txt",
            SessionLog::Reachability => "reachability.txt",
            SessionLog::Fix => "fix.txt",
        }
    }
}

/// Format one log line: `[HH:mm:ss] <message>`
pub fn format_log_line(time: &NaiveDateTime, message: &str) -> String {
    format!("[{}] {}", time.format("%H:%M:%S"), message)
}

/// Handle to one session directory, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: String,
    root: PathBuf,
}

impl SessionContext {
    /// Create `<output_root>/NetDiag_YYYYMMDD_HHMMSS` and its raw directory
    pub fn create(output_root: &Path) -> Result<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut root = output_root.join(format!("{}{}", SESSION_DIR_PREFIX, stamp));

        // Two runs in the same second get a numeric suffix
        let mut n = 1;
        while root.exists() {
            n += 1;
            root = output_root.join(format!("{}{}_{}", SESSION_DIR_PREFIX, stamp, n));
        }

        Self::open(&root)
    }

    /// Use an explicit directory as the session root
    pub fn open(root: &Path) -> Result<Self> {
        let raw = root.join(RAW_DIR);
        fs::create_dir_all(&raw).map_err(|source| TriageError::Session {
            path: raw.display().to_string(),
            source,
        })?;

        let id = uuid::Uuid::new_v4().to_string();
        info!(session = %id, root = %root.display(), "session directory ready");

        Ok(Self {
            id,
            root: root.to_path_buf(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self, log: SessionLog) -> PathBuf {
        self.root.join(log.file_name())
    }

    pub fn raw_path(&self, name: &str) -> PathBuf {
        self.root.join(RAW_DIR).join(format!("{}.txt", sanitize_name(name)))
    }

    /// Append one timestamped line to a session log
    pub fn log(&self, log: SessionLog, message: &str) -> Result<()> {
        let line = format_log_line(&Local::now().naive_local(), message);
        append_line(&self.log_path(log), &line)
    }

    /// Log, swallowing I/O failure after reporting it through tracing.
    /// Used on paths that must never fail (probes, remediation steps).
    pub fn note(&self, log: SessionLog, message: &str) {
        if let Err(e) = self.log(log, message) {
            tracing::warn!(log = log.file_name(), error = %e, "session log write failed");
        }
    }

    /// Write (replace) a raw capture file and return its path
    pub fn write_raw(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.raw_path(name);
        fs::write(&path, content).map_err(|source| TriageError::Session {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "raw capture written");
        Ok(path)
    }

    /// Append the verdict line to the reachability log, and to the summary
    /// if the orchestrator already created it
    pub fn record_verdict(&self, verdict: Verdict) -> Result<()> {
        let line = verdict.log_line();
        self.log(SessionLog::Reachability, &line)?;
        if self.log_path(SessionLog::Summary).exists() {
            self.log(SessionLog::Summary, &line)?;
        }
        Ok(())
    }

    /// Names of all raw captures written so far, sorted
    pub fn raw_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.root.join(RAW_DIR))? {
            let entry = entry?;
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TriageError::Session {
            path: path.display().to_string(),
            source,
        })?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Keep raw file names to a safe character set
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
