// SPDX-License-Identifier: GPL-3.0-only

//! Observable session state and events

use crate::backends::camera::types::{FacingMode, PermissionStatus};
use crate::decoder::DecodedSymbol;
use crate::errors::SessionError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Requested camera mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraMode {
    /// Main rear lens
    BackMain,
    /// Ultra-wide rear lens
    BackWide,
    /// Selfie camera
    Front,
    /// Let the catalog recommend a camera. Resolved on the first successful start.
    #[default]
    Auto,
}

impl CameraMode {
    pub const ALL: [CameraMode; 4] = [
        CameraMode::BackMain,
        CameraMode::BackWide,
        CameraMode::Front,
        CameraMode::Auto,
    ];

    /// Facing hint used by the facing-only acquisition strategy
    pub fn facing(&self) -> Option<FacingMode> {
        match self {
            CameraMode::BackMain | CameraMode::BackWide => Some(FacingMode::Environment),
            CameraMode::Front => Some(FacingMode::User),
            CameraMode::Auto => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CameraMode::BackMain => "Back",
            CameraMode::BackWide => "Wide",
            CameraMode::Front => "Front",
            CameraMode::Auto => "Auto",
        }
    }
}

impl From<LensRole> for CameraMode {
    fn from(role: LensRole) -> Self {
        match role {
            LensRole::BackMain => CameraMode::BackMain,
            LensRole::BackWide => CameraMode::BackWide,
            LensRole::Front => CameraMode::Front,
        }
    }
}

impl std::str::FromStr for CameraMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back-main" | "back" | "main" => Ok(CameraMode::BackMain),
            "back-wide" | "wide" => Ok(CameraMode::BackWide),
            "front" => Ok(CameraMode::Front),
            "auto" => Ok(CameraMode::Auto),
            other => Err(format!("unknown camera mode '{}'", other)),
        }
    }
}

/// Classified lens role of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LensRole {
    BackMain,
    BackWide,
    Front,
}

/// Stream controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Running,
}

/// Torch availability and status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TorchState {
    pub supported: bool,
    pub on: bool,
}

/// A camera as presented to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Opaque device handle
    pub id: String,
    /// Display label (numbered fallback when the platform reports none)
    pub label: String,
    /// Classified role, `None` when nothing can be inferred
    pub role: Option<LensRole>,
}

/// Snapshot of everything the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub devices: Vec<CameraDevice>,
    pub selected_device_id: Option<String>,
    pub mode: CameraMode,
    pub is_starting: bool,
    pub is_running: bool,
    pub torch_supported: bool,
    pub torch_on: bool,
    pub permission_status: PermissionStatus,
    pub paused: bool,
}

/// An accepted scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub text: String,
    /// Raw match artifact from the decoder
    pub raw: DecodedSymbol,
    pub scanned_at: DateTime<Local>,
}

/// Events delivered to the session owner
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A debounced decode result
    Result(ScanResult),
    /// A structural failure, emitted once per occurrence
    Error(SessionError),
}
