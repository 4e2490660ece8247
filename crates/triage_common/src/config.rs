//! nettriage configuration
//!
//! Config file: `--config FILE`, else `$NETTRIAGE_CONFIG`, else
//! `<config dir>/nettriage/config.toml`. A missing file means defaults.

use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment override for the config path
pub const CONFIG_ENV: &str = "NETTRIAGE_CONFIG";

/// Well-known probe targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTargets {
    /// Address pinged for external reachability
    #[serde(default = "default_external_ip")]
    pub external_ip: String,

    /// Hostname resolved for external DNS
    #[serde(default = "default_external_host")]
    pub external_host: String,

    /// Connectivity-check hostname, second external DNS signal
    #[serde(default = "default_ncsi_host")]
    pub ncsi_host: String,

    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
}

fn default_external_ip() -> String {
    "8.8.8.8".to_string()
}

fn default_external_host() -> String {
    "www.microsoft.com".to_string()
}

fn default_ncsi_host() -> String {
    "dns.msftncsi.com".to_string()
}

fn default_ping_count() -> u32 {
    2
}

fn default_ping_timeout_ms() -> u64 {
    1000
}

impl Default for ProbeTargets {
    fn default() -> Self {
        Self {
            external_ip: default_external_ip(),
            external_host: default_external_host(),
            ncsi_host: default_ncsi_host(),
            ping_count: default_ping_count(),
            ping_timeout_ms: default_ping_timeout_ms(),
        }
    }
}

/// Session output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Parent directory of the per-run session folders
    #[serde(default)]
    pub output_root: Option<PathBuf>,
}

impl SessionConfig {
    /// Configured root, else `<local data dir>/nettriage/sessions`,
    /// else `./nettriage-sessions`
    pub fn resolved_output_root(&self) -> PathBuf {
        if let Some(ref root) = self.output_root {
            return root.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("nettriage").join("sessions"))
            .unwrap_or_else(|| PathBuf::from("nettriage-sessions"))
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub probes: ProbeTargets,
}

impl TriageConfig {
    /// Default config path: `<config dir>/nettriage/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("nettriage").join("config.toml"))
    }

    /// Pick the config path: explicit, then env, then default
    pub fn discover_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        Self::default_path()
    }

    /// Load from a file. An explicit path must exist; a discovered one may
    /// be missing, in which case defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match Self::discover_path(explicit) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() && explicit.is_none() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TriageError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|message| TriageError::Config {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}
