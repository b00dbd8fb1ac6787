//! # Station Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line (highest priority)                                    │
//! │     --db ./agri.db                                                     │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     AGRI_DB_PATH, AGRI_SCANNER_DEVICE, AGRI_SETTLE_DELAY_MS            │
//! │                                                                         │
//! │  3. TOML Config File (--config, else platform config dir)              │
//! │     ~/.config/agri-station/station.toml (Linux)                        │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/agri/agri.db"
//! max_connections = 5
//!
//! [scanner]
//! device = "/dev/ttyACM0"   # "-" reads stdin
//! settle_delay_ms = 100
//! fps = 10
//! scan_box = 250
//! aspect_ratio = 1.0
//! facing = "environment"
//!
//! [label]
//! size_px = 200
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use agri_scan::{CameraSettings, Facing, ScanConfig, STDIN_TARGET};

use crate::commands::label::QR_MIN_PX;

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "station.toml";

/// Database file name inside the platform data directory.
pub const DB_FILE_NAME: &str = "agri.db";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: 5,
        }
    }
}

/// `[scanner]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Line scanner target: `-` for stdin or a device path.
    pub device: String,
    pub settle_delay_ms: u64,
    pub fps: u32,
    pub scan_box: u32,
    pub aspect_ratio: f32,
    pub facing: Facing,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        let camera = CameraSettings::default();
        ScannerSettings {
            device: STDIN_TARGET.to_string(),
            settle_delay_ms: ScanConfig::default().settle_delay.as_millis() as u64,
            fps: camera.fps,
            scan_box: camera.scan_box,
            aspect_ratio: camera.aspect_ratio,
            facing: camera.facing,
        }
    }
}

/// `[label]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    /// Side of the printed label card, in pixels.
    pub size_px: u32,
}

impl Default for LabelSettings {
    fn default() -> Self {
        LabelSettings { size_px: 200 }
    }
}

// =============================================================================
// Station Configuration
// =============================================================================

/// Complete station configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub scanner: ScannerSettings,

    #[serde(default)]
    pub label: LabelSettings,
}

impl StationConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`station.toml`); an explicit path must exist
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parses a `station.toml`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading station config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.scanner.device.trim().is_empty() {
            return Err(ConfigError::Invalid("scanner.device must not be empty".into()));
        }
        if self.scanner.fps == 0 || self.scanner.scan_box == 0 {
            return Err(ConfigError::Invalid(
                "scanner.fps and scanner.scan_box must be greater than 0".into(),
            ));
        }
        if !(self.scanner.aspect_ratio.is_finite() && self.scanner.aspect_ratio > 0.0) {
            return Err(ConfigError::Invalid(
                "scanner.aspect_ratio must be a positive number".into(),
            ));
        }
        if self.label.size_px < QR_MIN_PX {
            return Err(ConfigError::Invalid(format!(
                "label.size_px must be at least {}",
                QR_MIN_PX
            )));
        }
        Ok(())
    }

    /// Applies a `--db` override.
    pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.database.path = path;
        }
        self
    }

    /// Session settings for the scan commands.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .settle_delay(Duration::from_millis(self.scanner.settle_delay_ms))
            .camera(CameraSettings {
                facing: self.scanner.facing,
                fps: self.scanner.fps,
                scan_box: self.scanner.scan_box,
                aspect_ratio: self.scanner.aspect_ratio,
            })
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("AGRI_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(device) = var("AGRI_SCANNER_DEVICE") {
            debug!(device = %device, "Overriding scanner device from environment");
            self.scanner.device = device;
        }

        if let Some(delay) = var("AGRI_SETTLE_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(ms) => self.scanner.settle_delay_ms = ms,
                Err(_) => warn!(value = %delay, "Ignoring invalid AGRI_SETTLE_DELAY_MS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "agri", "agri-station")
}

/// Platform data directory, or the working directory when there is none.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/org.agri.agri-station/agri.db`
/// - **Windows**: `%APPDATA%\agri\agri-station\data\agri.db`
/// - **Linux**: `~/.local/share/agri-station/agri.db`
fn default_database_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join(DB_FILE_NAME),
        None => PathBuf::from(DB_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = StationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scanner.device, "-");
        assert_eq!(config.scanner.settle_delay_ms, 100);
        assert_eq!(config.label.size_px, 200);
        assert!(config.database.path.ends_with("agri.db"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scanner]\ndevice = \"/dev/ttyACM0\"\nfacing = \"user\"").unwrap();

        let config = StationConfig::from_file(file.path()).unwrap();

        assert_eq!(config.scanner.device, "/dev/ttyACM0");
        assert_eq!(config.scanner.facing, Facing::User);
        assert_eq!(config.scanner.fps, 10);
        assert_eq!(config.label, LabelSettings::default());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = StationConfig::load(Some(Path::new("/nonexistent/station.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scanner\nfps = ten").unwrap();

        assert!(matches!(
            StationConfig::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AGRI_DB_PATH", "/tmp/station.db"),
            ("AGRI_SCANNER_DEVICE", "/dev/ttyUSB0"),
            ("AGRI_SETTLE_DELAY_MS", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = StationConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/station.db"));
        assert_eq!(config.scanner.device, "/dev/ttyUSB0");
        // Unparseable value is ignored
        assert_eq!(config.scanner.settle_delay_ms, 100);

        let config = config.with_database_path(Some(PathBuf::from("cli.db")));
        assert_eq!(config.database.path, PathBuf::from("cli.db"));
    }

    #[test]
    fn test_validate_rejects_small_labels() {
        let mut config = StationConfig::default();
        config.label.size_px = 64;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_scan_config_carries_settings() {
        let mut config = StationConfig::default();
        config.scanner.settle_delay_ms = 0;
        config.scanner.fps = 5;

        let scan = config.scan_config();
        assert_eq!(scan.settle_delay, Duration::ZERO);
        assert_eq!(scan.camera.fps, 5);
        assert!(scan.auto_start);
    }
}
