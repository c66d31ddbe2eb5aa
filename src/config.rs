// SPDX-License-Identifier: GPL-3.0-only

//! Scanner configuration
//!
//! Read-only settings loaded once at startup. The session never writes
//! anything back.

use crate::constants::{capture, decode, timing};
use crate::session::CameraMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the user config dir
const CONFIG_DIR_NAME: &str = "camera-scanner";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Minimum spacing between accepted results (milliseconds)
    pub debounce_ms: u64,
    /// Haptic pulse on accepted result (milliseconds, 0 disables)
    pub haptic_ms: u64,
    /// Preferred capture width hint
    pub preferred_width: u32,
    /// Preferred capture height hint
    pub preferred_height: u32,
    /// Preferred frame rate hint
    pub preferred_frame_rate: u32,
    /// Bound on waiting for the first frame before probing (milliseconds)
    pub probe_timeout_ms: u64,
    /// Probe delay when no first-frame signal exists (milliseconds)
    pub probe_fallback_delay_ms: u64,
    /// Minimum spacing between decoded frames (milliseconds)
    pub decode_interval_ms: u64,
    /// Downscale bound for decoding
    pub decode_max_dimension: u32,
    /// Start the camera right after discovery
    pub auto_start: bool,
    /// Mode used by auto start
    pub initial_mode: CameraMode,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: timing::DEBOUNCE_WINDOW.as_millis() as u64,
            haptic_ms: timing::HAPTIC_PULSE.as_millis() as u64,
            preferred_width: capture::PREFERRED_WIDTH,
            preferred_height: capture::PREFERRED_HEIGHT,
            preferred_frame_rate: capture::PREFERRED_FRAME_RATE,
            probe_timeout_ms: timing::PROBE_TIMEOUT.as_millis() as u64,
            probe_fallback_delay_ms: timing::PROBE_FALLBACK_DELAY.as_millis() as u64,
            decode_interval_ms: timing::DECODE_INTERVAL.as_millis() as u64,
            decode_max_dimension: decode::MAX_DIMENSION,
            auto_start: true,
            initial_mode: CameraMode::Auto,
        }
    }
}

impl ScannerConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// `None` when haptics are disabled
    pub fn haptic_pulse(&self) -> Option<Duration> {
        (self.haptic_ms > 0).then(|| Duration::from_millis(self.haptic_ms))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn probe_fallback_delay(&self) -> Duration {
        Duration::from_millis(self.probe_fallback_delay_ms)
    }

    pub fn decode_interval(&self) -> Duration {
        Duration::from_millis(self.decode_interval_ms)
    }

    /// Default config file location (`~/.config/camera-scanner/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_json(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from an explicit path or the default location
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Cannot read config '{}': {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Invalid config '{}': {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
