// SPDX-License-Identifier: GPL-3.0-only

//! Still-image frame source for virtual cameras
//!
//! Loads an image file once and replays it as a live feed.

use crate::backends::camera::types::{
    BackendResult, FrameSender, PixelFormat, PlatformError, VideoFrame,
};
use crate::constants::file_formats;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Load an image file as a single RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<VideoFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !file_formats::is_image_extension(&extension) {
        return Err(PlatformError::Other(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        PlatformError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    Ok(frame_from_rgba(img.to_rgba8()))
}

/// Wrap an in-memory RGBA image as a frame
pub fn frame_from_rgba(rgba: image::RgbaImage) -> VideoFrame {
    let width = rgba.width();
    let height = rgba.height();
    let data: Vec<u8> = rgba.into_raw();

    debug!(width, height, "Image frame ready");

    VideoFrame {
        data: Arc::from(data.into_boxed_slice()),
        width,
        height,
        stride: width * 4,
        format: PixelFormat::RGBA,
        captured_at: Instant::now(),
    }
}

/// Replay `frame` on `tx` every `interval` until the receiver goes away
///
/// Frames are dropped rather than queued when the consumer lags.
pub fn spawn_still_feed(frame: Arc<VideoFrame>, interval: Duration, tx: FrameSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }
            let mut next = (*frame).clone();
            next.captured_at = Instant::now();
            if tx.try_send(Arc::new(next)).is_err() {
                trace!("Frame dropped, consumer busy");
            }
        }
        debug!("Still frame feed finished");
    })
}
