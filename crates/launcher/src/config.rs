//! Launcher configuration

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "CATALYST_LAUNCHER_CONFIG";

/// Lowest-priority config location
pub const SYSTEM_CONFIG_PATH: &str = "/etc/catalyst/launcher.toml";

/// Environment overrides applied on top of the config file
pub const FACILITY_ENV_VAR: &str = "DEBUGGER_FACILITY";
pub const HOST_ENV_VAR: &str = "DEBUGGER_HOST";
pub const PORT_ENV_VAR: &str = "DEBUGGER_PORT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Launcher configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Debug facility selection and attach address
    pub debugger: DebuggerConfig,

    /// Program to hand control to
    pub entry: EntryConfig,
}

/// Debugger attach configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Facility name ("dap" or "ptrace")
    pub facility: String,

    /// Address the DAP listener binds to
    pub host: String,

    /// Port the DAP listener binds to
    pub port: u16,

    /// How often the ptrace facility checks for a tracer (ms)
    pub poll_interval_ms: u64,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            facility: "dap".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5678,
            poll_interval_ms: 100,
        }
    }
}

impl DebuggerConfig {
    /// `host:port` as handed to the socket layer
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Entry point configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Program used when no command is given on the command line
    pub program: Option<String>,

    /// Arguments for `program`
    pub args: Vec<String>,

    /// Replace the launcher process (exec) instead of spawning a child
    pub replace_process: bool,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            replace_process: cfg!(unix),
        }
    }
}

/// An implicit config location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    pub path: PathBuf,
    /// Named by `CATALYST_LAUNCHER_CONFIG` rather than a default location
    pub from_env: bool,
}

impl SearchPath {
    fn new(path: impl Into<PathBuf>, from_env: bool) -> Self {
        Self {
            path: path.into(),
            from_env,
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults
    ///
    /// An explicit path must exist and parse. Implicit locations are tried in
    /// order and skipped with a warning when unreadable or invalid. Returns the
    /// config together with the file it came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_with(explicit, |key| env::var_os(key))
    }

    /// [`Config::load`] with the environment read through `lookup`
    pub fn load_with<F>(explicit: Option<&Path>, lookup: F) -> Result<(Self, Option<PathBuf>), ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            tracing::info!(?path, "loaded configuration");
            return Ok((config, Some(path.to_path_buf())));
        }

        for SearchPath { path, from_env } in Self::search_paths_with(lookup) {
            if !path.exists() {
                if from_env {
                    tracing::warn!(?path, "{CONFIG_ENV_VAR} points at a missing file");
                }
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => {
                    tracing::info!(?path, facility = %config.debugger.facility, "loaded configuration");
                    return Ok((config, Some(path)));
                }
                Err(e) => {
                    tracing::warn!(?path, error = %e, "skipping config");
                }
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok((Self::default(), None))
    }

    /// Read and parse a single config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Implicit config locations, highest priority first
    pub fn search_paths() -> Vec<SearchPath> {
        Self::search_paths_with(|key| env::var_os(key))
    }

    /// [`Config::search_paths`] with the environment read through `lookup`
    pub fn search_paths_with<F>(lookup: F) -> Vec<SearchPath>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut paths = Vec::new();
        if let Some(path) = lookup(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            paths.push(SearchPath::new(path, true));
        }
        if let Some(home) = lookup("HOME").filter(|h| !h.is_empty()) {
            let path = PathBuf::from(home)
                .join(".config")
                .join("catalyst")
                .join("launcher.toml");
            paths.push(SearchPath::new(path, false));
        }
        paths.push(SearchPath::new(SYSTEM_CONFIG_PATH, false));
        paths
    }

    /// Apply `DEBUGGER_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply `DEBUGGER_*` overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(facility) = lookup(FACILITY_ENV_VAR).filter(|v| !v.is_empty()) {
            self.debugger.facility = facility;
        }
        if let Some(host) = lookup(HOST_ENV_VAR).filter(|v| !v.is_empty()) {
            self.debugger.host = host;
        }
        if let Some(port) = lookup(PORT_ENV_VAR).filter(|v| !v.is_empty()) {
            match port.parse() {
                Ok(port) => self.debugger.port = port,
                Err(e) => {
                    tracing::warn!(value = %port, error = %e, "ignoring invalid {PORT_ENV_VAR}");
                }
            }
        }
    }
}
