// SPDX-License-Identifier: GPL-3.0-only

//! Capability probe for the live track
//!
//! Runs after a stream is live. Nothing here is fatal: any failure means the
//! feature is reported as unavailable.

use super::state::CameraMode;
use crate::backends::camera::CaptureStream;
use crate::backends::camera::types::{PlatformError, TrackConstraint, ZoomRange};
use crate::constants::capture;
use std::time::Duration;
use tracing::{debug, trace};

/// Wait until the stream is stable enough to query
///
/// Uses the stream's first-frame signal when it has one, bounded by
/// `timeout`. Streams without the signal wait `fallback_delay` instead.
pub async fn wait_until_stable<S: CaptureStream>(
    stream: &S,
    timeout: Duration,
    fallback_delay: Duration,
) {
    match tokio::time::timeout(timeout, stream.wait_first_frame()).await {
        Ok(Ok(())) => trace!("First frame received"),
        Ok(Err(PlatformError::NotSupported(_))) => tokio::time::sleep(fallback_delay).await,
        Ok(Err(e)) => debug!(error = %e, "First frame signal failed"),
        Err(_) => debug!(timeout_ms = timeout.as_millis(), "No first frame before timeout"),
    }
}

/// Whether the live track can drive a torch
///
/// Checks the track capability flag first, then the photo fill-light modes.
pub async fn probe_torch<S: CaptureStream>(stream: &S) -> bool {
    if !stream.has_live_track() {
        return false;
    }

    if let Some(torch) = stream.capabilities().await.and_then(|c| c.torch) {
        debug!(torch, "Torch capability from track");
        return torch;
    }

    match stream.photo_capabilities().await {
        Ok(photo) => {
            let supported = photo.has_light();
            debug!(supported, modes = ?photo.fill_light_modes, "Torch capability from photo modes");
            supported
        }
        Err(e) => {
            debug!(error = %e, "Photo capabilities unavailable");
            false
        }
    }
}

/// Zoom level that biases the track toward the requested lens
///
/// `None` for lenses without a bias and for unusable ranges.
pub fn target_zoom(mode: CameraMode, range: ZoomRange) -> Option<f64> {
    if !range.is_valid() {
        debug!(min = range.min, max = range.max, "Ignoring invalid zoom range");
        return None;
    }
    match mode {
        CameraMode::BackMain => range.clamp(capture::MAIN_LENS_ZOOM),
        CameraMode::BackWide => Some(range.min),
        CameraMode::Front | CameraMode::Auto => None,
    }
}

/// Best-effort zoom adjustment toward main (~1x) or wide (minimum zoom)
///
/// Returns the applied zoom, or `None` when nothing was applied.
pub async fn apply_lens_zoom<S: CaptureStream>(stream: &S, mode: CameraMode) -> Option<f64> {
    let range = stream.capabilities().await.and_then(|c| c.zoom)?;
    let zoom = target_zoom(mode, range)?;

    match stream.apply_constraints(&[TrackConstraint::Zoom(zoom)]).await {
        Ok(()) => {
            debug!(zoom, ?mode, "Applied lens zoom");
            Some(zoom)
        }
        Err(e) => {
            debug!(error = %e, zoom, "Zoom constraint rejected");
            None
        }
    }
}
