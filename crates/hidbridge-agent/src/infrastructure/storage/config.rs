//! TOML-based configuration for the device agent.
//!
//! A missing config file yields the full default configuration, and any
//! field absent from the file falls back to its default, so a freshly
//! flashed device comes up without manual setup.
//!
//! ```toml
//! [service]
//! version = "1.0.0"
//! secret = "change-me"
//! log_level = "info"
//!
//! [link]
//! host = "192.168.137.1"
//! port = 27121
//! reconnect_backoff_secs = [2, 4, 8, 16]
//!
//! [actuator]
//! device = "/dev/hidg0"
//!
//! # Optional: preselect a preset at startup. Live selection stays with the
//! # on-device menu UI.
//! [preset]
//! name = "p1"
//! sha256 = "…"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::actuator::hid::DEFAULT_DEVICE;
use crate::infrastructure::ui_bridge::PresetSelection;

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

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    /// Initial preset selection, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<PresetSelection>,
}

/// Handshake and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Protocol version string; must match the host exactly.
    #[serde(default = "default_version")]
    pub version: String,
    /// Static shared handshake secret.
    #[serde(default = "default_secret")]
    pub secret: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Host link settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkConfig {
    /// Host service address. The default is the USB gadget network gateway.
    #[serde(default = "default_host")]
    pub host: String,
    /// Host service TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Reconnect backoff schedule in seconds, walked saturating.
    #[serde(default = "default_backoff")]
    pub reconnect_backoff_secs: Vec<u64>,
}

/// Actuator hardware settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActuatorConfig {
    /// HID gadget endpoint to write reports to.
    #[serde(default = "default_device")]
    pub device: PathBuf,
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
fn default_host() -> String {
    "192.168.137.1".to_string()
}
fn default_port() -> u16 {
    27121
}
fn default_backoff() -> Vec<u64> {
    vec![2, 4, 8, 16]
}
fn default_device() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE)
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

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reconnect_backoff_secs: default_backoff(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads [`AgentConfig`] from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_device_defaults() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.service.version, "1.0.0");
        assert_eq!(cfg.link.host, "192.168.137.1");
        assert_eq!(cfg.link.port, 27121);
        assert_eq!(cfg.link.reconnect_backoff_secs, vec![2, 4, 8, 16]);
        assert_eq!(cfg.actuator.device, PathBuf::from("/dev/hidg0"));
        assert_eq!(cfg.preset, None);
    }

    #[test]
    fn test_deserialize_minimal_toml_uses_defaults() {
        let cfg: AgentConfig = toml::from_str("").expect("empty config is valid");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_deserialize_partial_link_keeps_other_defaults() {
        let cfg: AgentConfig = toml::from_str(
            r#"
[link]
host = "10.0.0.5"
"#,
        )
        .expect("partial config");

        assert_eq!(cfg.link.host, "10.0.0.5");
        assert_eq!(cfg.link.port, 27121);
        assert_eq!(cfg.service.secret, "change-me");
    }

    #[test]
    fn test_preset_section_parses_into_selection() {
        let cfg: AgentConfig = toml::from_str(
            r#"
[preset]
name = "p1"
sha256 = "abc"
"#,
        )
        .expect("preset config");

        let preset = cfg.preset.expect("preset present");
        assert_eq!(preset.name, "p1");
        assert_eq!(preset.sha256, "abc");
    }

    #[test]
    fn test_round_trip_preserves_custom_values() {
        let mut cfg = AgentConfig::default();
        cfg.link.reconnect_backoff_secs = vec![1, 3];
        cfg.preset = Some(PresetSelection {
            name: "p2".to_string(),
            sha256: "def".to_string(),
        });

        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AgentConfig = toml::from_str(&toml_str).expect("deserialize");

        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_load_config_returns_defaults_when_file_absent() {
        let path = std::env::temp_dir().join(format!(
            "hidbridge-agent-missing-{}.toml",
            std::process::id()
        ));
        let cfg = load_config(&path).expect("absent file is fine");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_load_config_rejects_invalid_toml() {
        let path = std::env::temp_dir().join(format!(
            "hidbridge-agent-bad-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
