// SPDX-License-Identifier: GPL-3.0-only

//! Camera platform abstraction
//!
//! The session manager never talks to hardware directly. Everything it needs
//! from the host (device enumeration, permission state, stream acquisition,
//! track capabilities, preview attachment, haptics) goes through the traits
//! in this module.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  UI / host layer    │
//! └──────────┬──────────┘
//!            │ commands, snapshots, events
//!            ▼
//! ┌─────────────────────┐
//! │   CameraSession     │  ← state machine, single active stream
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐      ┌──────────────────┐
//! │ CameraPlatform trait│ ───▶ │ CaptureStream    │
//! └──────────┬──────────┘      └──────────────────┘
//!            │
//!            ▼
//!   ┌────────────────┐
//!   │ VirtualPlatform│  ← in-memory implementation
//!   └────────────────┘
//! ```

pub mod types;

pub use types::*;

use async_trait::async_trait;
use std::time::Duration;

/// A live capture stream and its single video track
///
/// Implementations use interior mutability: the session shares the stream
/// with the capability probe, but only the session ever calls
/// [`CaptureStream::stop_tracks`].
#[async_trait]
pub trait CaptureStream: Send + Sync + 'static {
    /// Device the platform actually opened, if it reports one
    fn device_id(&self) -> Option<String>;

    /// Whether the video track is still live
    fn has_live_track(&self) -> bool;

    /// Query track capabilities (`None` when the platform has no query)
    async fn capabilities(&self) -> Option<TrackCapabilities>;

    /// Apply advanced constraints to the live track
    async fn apply_constraints(&self, constraints: &[TrackConstraint]) -> BackendResult<()>;

    /// Photo-capability fallback query
    async fn photo_capabilities(&self) -> BackendResult<PhotoCapabilities> {
        Err(PlatformError::NotSupported("photo capabilities".into()))
    }

    /// Photo-capability fallback for fill light
    async fn set_fill_light_mode(&self, _mode: FillLightMode) -> BackendResult<()> {
        Err(PlatformError::NotSupported("fill light mode".into()))
    }

    /// Resolves once the first stable frame has been produced.
    ///
    /// Platforms without such a signal return `NotSupported` immediately.
    async fn wait_first_frame(&self) -> BackendResult<()> {
        Err(PlatformError::NotSupported("first frame signal".into()))
    }

    /// Frame feed for in-process decoders
    fn subscribe_frames(&self) -> Option<FrameReceiver> {
        None
    }

    /// Stop every track of the stream. Must be idempotent.
    fn stop_tracks(&self);
}

/// Host camera platform
#[async_trait]
pub trait CameraPlatform: Send + Sync + 'static {
    type Stream: CaptureStream;

    /// Whether a media-device API exists at all
    fn has_media_devices(&self) -> bool;

    /// List all media devices (callers filter on [`DeviceKind::VideoInput`])
    async fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>>;

    /// Query camera permission. `None` when the platform has no permission API.
    async fn query_permission(&self) -> Option<PermissionStatus> {
        None
    }

    /// Acquire a capture stream
    async fn acquire(&self, constraints: &StreamConstraints) -> Result<Self::Stream, AcquireError>;

    /// Attach the stream to the preview surface.
    ///
    /// Resolves once stream metadata (dimensions) is known.
    async fn attach_preview(&self, _stream: &Self::Stream) -> BackendResult<()> {
        Ok(())
    }

    /// Start preview playback
    async fn play_preview(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Clear the preview attachment
    fn detach_preview(&self) {}

    /// Trigger a haptic pulse. Returns false when unsupported.
    fn vibrate(&self, _duration: Duration) -> bool {
        false
    }
}
