//! Configuration file support for grblconf.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (GRBLCONF_*)
//! 3. Local config file (./grblconf.toml)
//! 4. Global config file (~/.config/grblconf/config.toml)

use directories::ProjectDirs;
use grblconf::ZTravelSetting;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Controller identification and contract settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device-name marker expected in the port description.
    pub marker: Option<String>,
    /// Z-axis max-travel setting key, "132" or "140".
    pub z_travel: Option<String>,
}

impl DeviceConfig {
    /// Parsed Z-travel choice, if present and valid.
    pub fn z_travel(&self) -> Option<ZTravelSetting> {
        self.z_travel
            .as_deref()
            .and_then(ZTravelSetting::parse)
    }
}

/// Retry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of scan/configure attempts.
    pub max_attempts: Option<usize>,
}

/// Conflicting desktop application handling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Process name to terminate before orchestration starts.
    pub process: Option<String>,
}

/// Machine profile installation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Profile file name to copy after a successful setup.
    pub file: Option<String>,
    /// Destination subdirectory under the local app-data directory.
    pub dest_subdir: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Device settings.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Conflicting application settings.
    #[serde(default)]
    pub conflict: ConflictConfig,
    /// Profile installation settings.
    #[serde(default)]
    pub install: InstallConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                if let Some(global_config) = Self::load_from_file(&global_path) {
                    debug!("loaded global config from {}", global_path.display());
                    config.merge(global_config);
                }
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new("grblconf.toml")) {
            debug!("loaded local config from grblconf.toml");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("loaded config from {}", path.display());
            config
        } else {
            warn!(
                "could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "grblconf").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        if other.device.marker.is_some() {
            self.device.marker = other.device.marker;
        }
        if other.device.z_travel.is_some() {
            self.device.z_travel = other.device.z_travel;
        }
        if other.retry.max_attempts.is_some() {
            self.retry.max_attempts = other.retry.max_attempts;
        }
        if other.conflict.process.is_some() {
            self.conflict.process = other.conflict.process;
        }
        if other.install.file.is_some() {
            self.install.file = other.install.file;
        }
        if other.install.dest_subdir.is_some() {
            self.install.dest_subdir = other.install.dest_subdir;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.device.marker.is_none());
        assert!(config.device.z_travel.is_none());
        assert!(config.retry.max_attempts.is_none());
        assert!(config.conflict.process.is_none());
        assert!(config.install.file.is_none());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[device]
marker = "Shapeoko"
z_travel = "140"

[retry]
max_attempts = 2

[conflict]
process = "carbidemotion.exe"

[install]
file = "shapeoko.json"
dest_subdir = "Carbide 3D/CarbideMotion6"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.marker.as_deref(), Some("Shapeoko"));
        assert_eq!(config.device.z_travel(), Some(ZTravelSetting::Extended));
        assert_eq!(config.retry.max_attempts, Some(2));
        assert_eq!(config.conflict.process.as_deref(), Some("carbidemotion.exe"));
        assert_eq!(config.install.file.as_deref(), Some("shapeoko.json"));
    }

    #[test]
    fn test_config_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.device.marker.is_none());
        assert!(config.retry.max_attempts.is_none());
    }

    #[test]
    fn test_invalid_z_travel_parses_to_none() {
        let config: Config = toml::from_str("[device]\nz_travel = \"999\"\n").unwrap();
        assert!(config.device.z_travel.is_some());
        assert!(config.device.z_travel().is_none());
    }

    #[test]
    fn test_config_merge_prefers_other_when_set() {
        let mut base = Config::default();
        base.device.marker = Some("Shapeoko".into());
        base.retry.max_attempts = Some(4);

        let mut other = Config::default();
        other.retry.max_attempts = Some(2);

        base.merge(other);
        assert_eq!(base.device.marker.as_deref(), Some("Shapeoko"));
        assert_eq!(base.retry.max_attempts, Some(2));
    }

    #[test]
    fn test_config_merge_does_not_overwrite_with_none() {
        let mut base = Config::default();
        base.device.z_travel = Some("132".into());

        base.merge(Config::default());
        assert_eq!(base.device.z_travel(), Some(ZTravelSetting::Legacy));
    }

    #[test]
    fn test_load_from_path_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("grblconf.toml");
        fs::write(
            &path,
            "[device]\nmarker = \"Nomad\"\n[retry]\nmax_attempts = 3\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path);
        assert_eq!(config.device.marker.as_deref(), Some("Nomad"));
        assert_eq!(config.retry.max_attempts, Some(3));
    }

    #[test]
    fn test_load_from_path_nonexistent_returns_default() {
        let config = Config::load_from_path(Path::new("/nonexistent/grblconf.toml"));
        assert!(config.device.marker.is_none());
    }

    #[test]
    fn test_global_config_path_is_some() {
        if let Some(p) = Config::global_config_path() {
            assert!(p.to_str().unwrap().contains("grblconf"));
            assert!(p.to_str().unwrap().ends_with("config.toml"));
        }
    }
}
