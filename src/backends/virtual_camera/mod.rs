// SPDX-License-Identifier: GPL-3.0-only

//! In-memory camera platform
//!
//! [`VirtualPlatform`] implements [`CameraPlatform`] over a list of
//! [`VirtualDevice`]s. Devices carry whatever label, facing, zoom range and
//! torch support a scenario needs; an optional still image is replayed as
//! every stream's frame feed.
//!
//! ```text
//!   VirtualDevice list ──► acquire(constraints) ──► VirtualStream
//!                                                       │
//!   still image (file_source) ──► spawn_still_feed ─────┘──► FrameReceiver
//! ```

mod file_source;

pub use file_source::{frame_from_rgba, load_image_as_frame, spawn_still_feed};

use crate::backends::camera::types::{
    AcquireError, BackendResult, FacingMode, FillLightMode, FrameReceiver, MediaDeviceInfo,
    PermissionStatus, PhotoCapabilities, PlatformError, StreamConstraints, TrackCapabilities,
    TrackConstraint, VideoFrame, ZoomRange,
};
use crate::backends::camera::{CameraPlatform, CaptureStream};
use crate::constants::decode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Default replay rate of the still-image feed
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// A simulated camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualDevice {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub facing: Option<FacingMode>,
    #[serde(default)]
    pub zoom: Option<ZoomRange>,
    /// Reports `torch` in track capabilities
    #[serde(default)]
    pub torch: bool,
    /// Reports a flash fill-light mode in photo capabilities
    #[serde(default)]
    pub photo_fill_light: bool,
}

impl VirtualDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            facing: None,
            zoom: None,
            torch: false,
            photo_fill_light: false,
        }
    }

    pub fn facing(mut self, facing: FacingMode) -> Self {
        self.facing = Some(facing);
        self
    }

    pub fn zoom(mut self, min: f64, max: f64) -> Self {
        self.zoom = Some(ZoomRange { min, max });
        self
    }

    pub fn with_torch(mut self) -> Self {
        self.torch = true;
        self
    }

    pub fn with_photo_fill_light(mut self) -> Self {
        self.photo_fill_light = true;
        self
    }

    /// Back main, back ultra-wide and front camera of a typical phone
    pub fn three_lens_phone() -> Vec<VirtualDevice> {
        vec![
            VirtualDevice::new("back-main", "Back Camera")
                .facing(FacingMode::Environment)
                .zoom(1.0, 10.0)
                .with_torch(),
            VirtualDevice::new("back-wide", "Back Ultra Wide Camera")
                .facing(FacingMode::Environment)
                .zoom(0.5, 2.0),
            VirtualDevice::new("front", "Front Camera").facing(FacingMode::User),
        ]
    }

    /// Load a device list from a JSON file
    pub fn load_list(path: &Path) -> BackendResult<Vec<VirtualDevice>> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PlatformError::Other(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            PlatformError::Other(format!("Invalid device list '{}': {}", path.display(), e))
        })
    }
}

/// Camera platform backed by [`VirtualDevice`]s
pub struct VirtualPlatform {
    devices: Vec<VirtualDevice>,
    frame: Option<Arc<VideoFrame>>,
    frame_interval: Duration,
    permission: Option<PermissionStatus>,
    open: Arc<AtomicUsize>,
    acquired: AtomicUsize,
}

impl VirtualPlatform {
    pub fn new(devices: Vec<VirtualDevice>) -> Self {
        Self {
            devices,
            frame: None,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            permission: None,
            open: Arc::new(AtomicUsize::new(0)),
            acquired: AtomicUsize::new(0),
        }
    }

    /// Replay `frame` on every stream
    pub fn with_frame(mut self, frame: VideoFrame) -> Self {
        self.frame = Some(Arc::new(frame));
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Report this status from the permission query
    pub fn with_permission(mut self, status: PermissionStatus) -> Self {
        self.permission = Some(status);
        self
    }

    pub fn devices(&self) -> &[VirtualDevice] {
        &self.devices
    }

    /// Streams currently holding a live track
    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    /// Total successful acquisitions
    pub fn acquisitions(&self) -> usize {
        self.acquired.load(Ordering::Acquire)
    }

    fn select(&self, constraints: &StreamConstraints) -> Result<&VirtualDevice, AcquireError> {
        if let Some(id) = &constraints.device_id {
            return self
                .devices
                .iter()
                .find(|d| &d.id == id)
                .ok_or_else(|| AcquireError::Overconstrained(format!("deviceId {}", id)));
        }
        if let Some(facing) = constraints.facing_mode
            && let Some(device) = self.devices.iter().find(|d| d.facing == Some(facing))
        {
            return Ok(device);
        }
        self.devices
            .first()
            .ok_or_else(|| AcquireError::NotFound("no video input".into()))
    }
}

#[async_trait]
impl CameraPlatform for VirtualPlatform {
    type Stream = VirtualStream;

    fn has_media_devices(&self) -> bool {
        true
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>> {
        Ok(self
            .devices
            .iter()
            .map(|d| MediaDeviceInfo::video(d.id.clone(), d.label.clone()))
            .collect())
    }

    async fn query_permission(&self) -> Option<PermissionStatus> {
        self.permission
    }

    async fn acquire(&self, constraints: &StreamConstraints) -> Result<VirtualStream, AcquireError> {
        if self.permission == Some(PermissionStatus::Denied) {
            return Err(AcquireError::NotAllowed("camera permission denied".into()));
        }
        let device = self.select(constraints)?.clone();

        let open = self.open.fetch_add(1, Ordering::AcqRel) + 1;
        self.acquired.fetch_add(1, Ordering::AcqRel);
        info!(device = %device.id, constraints = %constraints, open, "Virtual stream opened");

        let zoom = device.zoom.and_then(|z| z.clamp(1.0)).unwrap_or(1.0);
        Ok(VirtualStream {
            device,
            frame: self.frame.clone(),
            frame_interval: self.frame_interval,
            live: AtomicBool::new(true),
            open: Arc::clone(&self.open),
            torch_on: AtomicBool::new(false),
            zoom: Mutex::new(zoom),
            feeds: Mutex::new(Vec::new()),
        })
    }

    fn vibrate(&self, pulse: Duration) -> bool {
        trace!(pulse_ms = pulse.as_millis(), "Virtual haptic pulse");
        true
    }
}

/// A live stream on a [`VirtualDevice`]
pub struct VirtualStream {
    device: VirtualDevice,
    frame: Option<Arc<VideoFrame>>,
    frame_interval: Duration,
    live: AtomicBool,
    open: Arc<AtomicUsize>,
    torch_on: AtomicBool,
    zoom: Mutex<f64>,
    feeds: Mutex<Vec<JoinHandle<()>>>,
}

impl VirtualStream {
    pub fn torch_on(&self) -> bool {
        self.torch_on.load(Ordering::Acquire)
    }

    pub fn zoom(&self) -> f64 {
        *self.zoom.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CaptureStream for VirtualStream {
    fn device_id(&self) -> Option<String> {
        Some(self.device.id.clone())
    }

    fn has_live_track(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    async fn capabilities(&self) -> Option<TrackCapabilities> {
        if !self.has_live_track() {
            return None;
        }
        Some(TrackCapabilities {
            torch: self.device.torch.then_some(true),
            zoom: self.device.zoom,
        })
    }

    async fn apply_constraints(&self, constraints: &[TrackConstraint]) -> BackendResult<()> {
        if !self.has_live_track() {
            return Err(PlatformError::TrackEnded);
        }
        for constraint in constraints {
            match *constraint {
                TrackConstraint::Torch(on) => {
                    if !self.device.torch {
                        return Err(PlatformError::NotSupported("torch".into()));
                    }
                    self.torch_on.store(on, Ordering::Release);
                }
                TrackConstraint::Zoom(level) => {
                    let zoom = self
                        .device
                        .zoom
                        .and_then(|range| range.clamp(level))
                        .ok_or_else(|| PlatformError::NotSupported("zoom".into()))?;
                    *self.zoom.lock().unwrap_or_else(|e| e.into_inner()) = zoom;
                }
            }
        }
        Ok(())
    }

    async fn photo_capabilities(&self) -> BackendResult<PhotoCapabilities> {
        let mut fill_light_modes = vec![FillLightMode::Off];
        if self.device.photo_fill_light {
            fill_light_modes.push(FillLightMode::Flash);
        }
        Ok(PhotoCapabilities { fill_light_modes })
    }

    async fn set_fill_light_mode(&self, mode: FillLightMode) -> BackendResult<()> {
        if !self.device.photo_fill_light {
            return Err(PlatformError::NotSupported("fill light".into()));
        }
        self.torch_on
            .store(matches!(mode, FillLightMode::Flash | FillLightMode::Torch), Ordering::Release);
        Ok(())
    }

    async fn wait_first_frame(&self) -> BackendResult<()> {
        if self.frame.is_some() {
            Ok(())
        } else {
            Err(PlatformError::NotSupported("no frame source".into()))
        }
    }

    fn subscribe_frames(&self) -> Option<FrameReceiver> {
        let frame = self.frame.clone()?;
        if !self.has_live_track() {
            return None;
        }
        let (tx, rx) = tokio::sync::mpsc::channel(decode::FRAME_CHANNEL_CAPACITY);
        let handle = spawn_still_feed(frame, self.frame_interval, tx);
        self.feeds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
        Some(rx)
    }

    fn stop_tracks(&self) {
        if !self.live.swap(false, Ordering::AcqRel) {
            return;
        }
        for handle in self
            .feeds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
        {
            handle.abort();
        }
        let open = self.open.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(device = %self.device.id, open, "Virtual stream stopped");
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exact_device_or_overconstrained() {
        let platform = VirtualPlatform::new(VirtualDevice::three_lens_phone());
        let stream = platform
            .acquire(&StreamConstraints::exact_device("front"))
            .await
            .unwrap();
        assert_eq!(stream.device_id().as_deref(), Some("front"));

        let missing = platform
            .acquire(&StreamConstraints::exact_device("nope"))
            .await;
        assert!(matches!(missing, Err(AcquireError::Overconstrained(_))));
    }

    #[tokio::test]
    async fn test_open_count_follows_stop() {
        let platform = VirtualPlatform::new(VirtualDevice::three_lens_phone());
        let stream = platform
            .acquire(&StreamConstraints::facing(FacingMode::User))
            .await
            .unwrap();
        assert_eq!(stream.device_id().as_deref(), Some("front"));
        assert_eq!(platform.open_streams(), 1);

        stream.stop_tracks();
        stream.stop_tracks();
        assert_eq!(platform.open_streams(), 0);
        assert!(stream.capabilities().await.is_none());

        let other = platform.acquire(&StreamConstraints::any_video()).await.unwrap();
        drop(other);
        assert_eq!(platform.open_streams(), 0);
        assert_eq!(platform.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_torch_and_zoom_constraints() {
        let platform = VirtualPlatform::new(VirtualDevice::three_lens_phone());
        let main = platform
            .acquire(&StreamConstraints::exact_device("back-main"))
            .await
            .unwrap();
        main.apply_constraints(&[TrackConstraint::Torch(true), TrackConstraint::Zoom(20.0)])
            .await
            .unwrap();
        assert!(main.torch_on());
        assert_eq!(main.zoom(), 10.0);

        let front = platform
            .acquire(&StreamConstraints::exact_device("front"))
            .await
            .unwrap();
        assert!(
            front
                .apply_constraints(&[TrackConstraint::Torch(true)])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_denied_permission_rejects_acquire() {
        let platform = VirtualPlatform::new(VirtualDevice::three_lens_phone())
            .with_permission(PermissionStatus::Denied);
        let result = platform.acquire(&StreamConstraints::any_video()).await;
        assert!(matches!(result, Err(AcquireError::NotAllowed(_))));
    }

    #[test]
    fn test_device_list_json() {
        let json = r#"[
            {"id": "a", "label": "Rear", "facing": "environment", "zoom": {"min": 1.0, "max": 8.0}, "torch": true},
            {"id": "b"}
        ]"#;
        let devices: Vec<VirtualDevice> = serde_json::from_str(json).unwrap();
        assert_eq!(devices[0].facing, Some(FacingMode::Environment));
        assert!(devices[0].torch);
        assert_eq!(devices[1].label, "");
        assert!(!devices[1].photo_fill_light);
    }
}
