//! Driver configuration (spec §6 "Configuration"): CAN channel, CAN
//! bitrate, and the UI command-stream endpoint address, loaded from TOML.
//!
//! Follows the `serde` + `toml` load pattern of the teacher-adjacent
//! `core-config` crate (`freddiehaddad-oxidized`): a `Deserialize`-able file
//! shape with `#[serde(default)]` fields, loaded once at startup and handed
//! to the rest of the driver as a plain struct.

use std::path::Path;

use serde::Deserialize;

/// Default CAN bitrate for the DDP pair (spec §6).
pub const DEFAULT_BITRATE: u32 = 100_000;
/// Default UI command-stream endpoint: a Unix domain socket path.
pub const DEFAULT_UI_ENDPOINT: &str = "/run/ddp-driverd/ui.sock";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_can_channel")]
    pub can_channel: String,
    #[serde(default = "Config::default_can_bitrate")]
    pub can_bitrate: u32,
    #[serde(default = "Config::default_ui_endpoint")]
    pub ui_endpoint: String,
    /// Spec §4.3.4: disabled by default, matching the original's
    /// `ENABLE_INACTIVITY_RELEASE = False`.
    #[serde(default)]
    pub enable_inactivity_release: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            can_channel: Self::default_can_channel(),
            can_bitrate: Self::default_can_bitrate(),
            ui_endpoint: Self::default_ui_endpoint(),
            enable_inactivity_release: false,
        }
    }
}

impl Config {
    fn default_can_channel() -> String {
        "can0".to_string()
    }

    fn default_can_bitrate() -> u32 {
        DEFAULT_BITRATE
    }

    fn default_ui_endpoint() -> String {
        DEFAULT_UI_ENDPOINT.to_string()
    }

    /// Load configuration from a TOML file. Missing optional fields fall
    /// back to the defaults above via `#[serde(default = ...)]`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_spec_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.can_bitrate, 100_000);
        assert!(!cfg.enable_inactivity_release);
    }

    #[test]
    fn test_load_missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddp.toml");
        std::fs::write(&path, "can_channel = \"can1\"\n").unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.can_channel, "can1");
        assert_eq!(cfg.can_bitrate, DEFAULT_BITRATE);
        assert_eq!(cfg.ui_endpoint, DEFAULT_UI_ENDPOINT);
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddp.toml");
        std::fs::write(
            &path,
            "can_channel = \"can2\"\ncan_bitrate = 500000\nui_endpoint = \"/tmp/ui.sock\"\nenable_inactivity_release = true\n",
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.can_channel, "can2");
        assert_eq!(cfg.can_bitrate, 500_000);
        assert_eq!(cfg.ui_endpoint, "/tmp/ui.sock");
        assert!(cfg.enable_inactivity_release);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let path = Path::new("/nonexistent/ddp-config-test/ddp.toml");
        assert!(Config::load(path).is_err());
    }
}
