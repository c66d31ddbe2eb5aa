// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera platform abstraction

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Kind of media device reported by enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Raw enumeration entry from the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub kind: DeviceKind,
    /// Opaque device handle
    pub id: String,
    /// Human-readable label, empty until permission is granted on most platforms
    pub label: String,
}

impl MediaDeviceInfo {
    pub fn video(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: DeviceKind::VideoInput,
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Hardware-reported camera orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Faces the user (selfie camera)
    User,
    /// Faces away from the user
    Environment,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// Capture request descriptor
///
/// Either an exact device, a facing hint, or nothing at all. Resolution and
/// frame rate are soft hints the platform may ignore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConstraints {
    pub device_id: Option<String>,
    pub facing_mode: Option<FacingMode>,
    pub ideal_width: Option<u32>,
    pub ideal_height: Option<u32>,
    pub ideal_frame_rate: Option<u32>,
}

impl StreamConstraints {
    /// Request a specific device
    pub fn exact_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }

    /// Request any camera with the given orientation
    pub fn facing(facing_mode: FacingMode) -> Self {
        Self {
            facing_mode: Some(facing_mode),
            ..Self::default()
        }
    }

    /// Request any video source
    pub fn any_video() -> Self {
        Self::default()
    }

    /// Attach preferred resolution and frame rate hints
    pub fn with_hints(mut self, width: u32, height: u32, frame_rate: u32) -> Self {
        self.ideal_width = Some(width);
        self.ideal_height = Some(height);
        self.ideal_frame_rate = Some(frame_rate);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.device_id.is_none() && self.facing_mode.is_none()
    }
}

impl std::fmt::Display for StreamConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.device_id, &self.facing_mode) {
            (Some(id), _) => write!(f, "device={}", id)?,
            (None, Some(facing)) => write!(f, "facing={}", facing)?,
            (None, None) => write!(f, "any video")?,
        }
        if let (Some(w), Some(h)) = (self.ideal_width, self.ideal_height) {
            write!(f, " {}x{}", w, h)?;
        }
        if let Some(fps) = self.ideal_frame_rate {
            write!(f, "@{}fps", fps)?;
        }
        Ok(())
    }
}

/// Typed failure from a capture acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// The constraints cannot be satisfied by any device
    Overconstrained(String),
    /// The requested device does not exist (anymore)
    NotFound(String),
    /// The user or platform denied access
    NotAllowed(String),
    /// The platform has no capture support
    NotSupported(String),
    /// Anything else (device busy, hardware error, ...)
    Other(String),
}

impl AcquireError {
    /// Errors that allow the next, looser strategy to be tried
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            AcquireError::Overconstrained(_) | AcquireError::NotFound(_)
        )
    }
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquireError::Overconstrained(msg) => write!(f, "Overconstrained: {}", msg),
            AcquireError::NotFound(msg) => write!(f, "Device not found: {}", msg),
            AcquireError::NotAllowed(msg) => write!(f, "Not allowed: {}", msg),
            AcquireError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            AcquireError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AcquireError {}

/// Result type for platform operations
pub type BackendResult<T> = Result<T, PlatformError>;

/// Error types for non-acquisition platform operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Operation or capability not available
    NotSupported(String),
    /// Track already stopped
    TrackEnded,
    /// Playback could not start (usually no user gesture yet)
    PlaybackBlocked(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            PlatformError::TrackEnded => write!(f, "Track has ended"),
            PlatformError::PlaybackBlocked(msg) => write!(f, "Playback blocked: {}", msg),
            PlatformError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Permission state as mirrored from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Prompt,
    #[default]
    Unknown,
}

/// Optical zoom range of a track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    /// Finite bounds with `min <= max`
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Clamp `value` into the range. `None` when the reported range is unusable.
    pub fn clamp(&self, value: f64) -> Option<f64> {
        self.is_valid().then(|| value.clamp(self.min, self.max))
    }
}

/// Capability report for a live video track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackCapabilities {
    /// `Some` when the platform reports the torch field at all
    pub torch: Option<bool>,
    pub zoom: Option<ZoomRange>,
}

/// Advanced constraint applied to a live track
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackConstraint {
    Torch(bool),
    Zoom(f64),
}

/// Photo fill-light mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillLightMode {
    Off,
    Auto,
    Flash,
    Torch,
}

/// Photo-capability report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoCapabilities {
    pub fill_light_modes: Vec<FillLightMode>,
}

impl PhotoCapabilities {
    /// Whether any reported fill-light mode can light the scene
    pub fn has_light(&self) -> bool {
        self.fill_light_modes
            .iter()
            .any(|m| matches!(m, FillLightMode::Flash | FillLightMode::Torch))
    }
}

/// Pixel format of frames handed to decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// Gray8 - 8-bit luma
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::RGBA => 4,
            Self::Gray8 => 1,
        }
    }
}

/// A single frame from a capture stream
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    pub captured_at: Instant,
}

/// Frame receiver type for decode loops
pub type FrameReceiver = tokio::sync::mpsc::Receiver<Arc<VideoFrame>>;

/// Frame sender type for decode loops
pub type FrameSender = tokio::sync::mpsc::Sender<Arc<VideoFrame>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_classes() {
        assert!(AcquireError::Overconstrained("x".into()).allows_fallback());
        assert!(AcquireError::NotFound("x".into()).allows_fallback());
        assert!(!AcquireError::NotAllowed("x".into()).allows_fallback());
        assert!(!AcquireError::NotSupported("x".into()).allows_fallback());
        assert!(!AcquireError::Other("x".into()).allows_fallback());
    }

    #[test]
    fn test_constraints_display() {
        let c = StreamConstraints::exact_device("cam0").with_hints(1280, 720, 30);
        assert_eq!(c.to_string(), "device=cam0 1280x720@30fps");
        assert_eq!(StreamConstraints::any_video().to_string(), "any video");
        assert!(StreamConstraints::any_video().is_unconstrained());
    }

    #[test]
    fn test_photo_capabilities_light() {
        let caps = PhotoCapabilities {
            fill_light_modes: vec![FillLightMode::Auto, FillLightMode::Flash],
        };
        assert!(caps.has_light());
        assert!(!PhotoCapabilities::default().has_light());
    }

    #[test]
    fn test_zoom_range_clamp() {
        let range = ZoomRange { min: 0.5, max: 4.0 };
        assert_eq!(range.clamp(10.0), Some(4.0));
        assert_eq!(range.clamp(0.1), Some(0.5));

        assert_eq!(ZoomRange { min: 2.0, max: 1.0 }.clamp(1.5), None);
        assert_eq!(ZoomRange { min: f64::NAN, max: 4.0 }.clamp(1.0), None);
        assert_eq!(ZoomRange { min: 1.0, max: f64::INFINITY }.clamp(1.0), None);
    }
}
