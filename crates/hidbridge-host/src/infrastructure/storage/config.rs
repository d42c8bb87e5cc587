//! TOML-based configuration for the host service.
//!
//! Fields annotated with `#[serde(default = "...")]` fall back to their
//! defaults when absent from the file, and a missing config file yields the
//! full default configuration, so the service runs on first start without
//! any setup.
//!
//! ```toml
//! [service]
//! version = "1.0.0"
//! secret = "change-me"
//! log_level = "info"
//!
//! [network]
//! listen_host = "0.0.0.0"
//! listen_port = 27121
//!
//! [automation]
//! executable = "/opt/hidbridge/automation-runner"
//! preset_dir = "/opt/hidbridge/presets"
//! termination_grace_secs = 2
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
}

/// Handshake and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Protocol version string; agents must match it exactly.
    #[serde(default = "default_version")]
    pub version: String,
    /// Static shared handshake secret.
    #[serde(default = "default_secret")]
    pub secret: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Listen socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Interface to bind; `"0.0.0.0"` binds all.
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    /// TCP port for agent sessions.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

/// Automation process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomationConfig {
    /// The automation executable launched per session.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Directory holding the preset files agents may request.
    #[serde(default = "default_preset_dir")]
    pub preset_dir: PathBuf,
    /// Seconds between the graceful termination request and the kill.
    #[serde(default = "default_grace_secs")]
    pub termination_grace_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0.0".to_string()
}
fn default_secret() -> String {
    "change-me".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}
fn default_listen_port() -> u16 {
    27121
}
fn default_executable() -> PathBuf {
    PathBuf::from("automation-runner")
}
fn default_preset_dir() -> PathBuf {
    PathBuf::from("presets")
}
fn default_grace_secs() -> u64 {
    2
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            secret: default_secret(),
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            preset_dir: default_preset_dir(),
            termination_grace_secs: default_grace_secs(),
        }
    }
}

impl HostConfig {
    /// `host:port` string for the listen socket.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.network.listen_host, self.network.listen_port)
    }

    /// Termination grace period as a [`Duration`].
    pub fn termination_grace(&self) -> Duration {
        Duration::from_secs(self.automation.termination_grace_secs)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads [`HostConfig`] from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HostConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
