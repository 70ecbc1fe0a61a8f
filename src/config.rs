// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{self, APP_NAME};
use crate::errors::{AppError, AppResult};
use crate::scanner::ScanFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name of the configuration inside the config directory
const CONFIG_FILE: &str = "config.json";

/// User configuration
///
/// Stored as JSON in `$XDG_CONFIG_HOME/qrscan/config.json`. Missing fields
/// take their default value so older files keep loading.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pause after a successful camera scan, in milliseconds
    pub resume_delay_ms: u64,
    /// JPEG quality used when compressing captured frames (1-100)
    pub jpeg_quality: u8,
    /// Symbol formats the decoder looks for
    pub formats: Vec<ScanFormat>,
    /// Camera device path (None = first capture device)
    pub camera_device: Option<String>,
    /// Requested capture width
    pub capture_width: u32,
    /// Requested capture height
    pub capture_height: u32,
    /// Camera frames larger than this are downscaled before decoding
    pub max_frame_dimension: u32,
    /// Suppress notifications for the same text seen again within `repeat_window_ms`
    pub suppress_repeats: bool,
    /// Window for repeat suppression, in milliseconds
    pub repeat_window_ms: u64,
    /// Consecutive decoder failures before the camera loop stops
    pub max_decode_failures: u32,
    /// Directory for snapshots of successfully decoded frames (None = disabled)
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resume_delay_ms: constants::RESUME_DELAY.as_millis() as u64,
            jpeg_quality: constants::JPEG_QUALITY,
            formats: ScanFormat::ALL.to_vec(),
            camera_device: None,
            capture_width: constants::capture::DEFAULT_WIDTH,
            capture_height: constants::capture::DEFAULT_HEIGHT,
            max_frame_dimension: constants::capture::MAX_DECODE_DIMENSION,
            suppress_repeats: false,
            repeat_window_ms: constants::REPEAT_WINDOW.as_millis() as u64,
            max_decode_failures: constants::MAX_DECODE_FAILURES,
            snapshot_dir: None,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Load the config from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config from `path`
    ///
    /// A missing file is not an error. A malformed file is logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Config>(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config.sanitized()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                Self::default()
            }
        }
    }

    /// Save the config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub fn repeat_window(&self) -> Duration {
        Duration::from_millis(self.repeat_window_ms)
    }

    /// Clamp out-of-range values loaded from disk
    fn sanitized(mut self) -> Self {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.formats.is_empty() {
            warn!("Config lists no scan formats, using all");
            self.formats = ScanFormat::ALL.to_vec();
        }
        if self.max_decode_failures == 0 {
            self.max_decode_failures = constants::MAX_DECODE_FAILURES;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"resume_delay_ms": 500}"#).unwrap();
        assert_eq!(config.resume_delay(), Duration::from_millis(500));
        assert_eq!(config.jpeg_quality, constants::JPEG_QUALITY);
        assert_eq!(config.formats, ScanFormat::ALL.to_vec());
    }

    #[test]
    fn test_sanitized_clamps_values() {
        let config = Config {
            jpeg_quality: 0,
            formats: Vec::new(),
            max_decode_failures: 0,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.formats.len(), ScanFormat::ALL.len());
        assert_eq!(config.max_decode_failures, constants::MAX_DECODE_FAILURES);
    }
}
