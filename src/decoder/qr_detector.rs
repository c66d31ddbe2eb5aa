// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection backed by the rqrr crate
//!
//! Frames are converted to luma, downscaled to a bounded size and handed to
//! rqrr. Symbol corners are scaled back to the original frame coordinates.

use super::frame_loop::{DecodeLoopController, LoopAction};
use super::{DecodeEngine, DecodeHandle, DecodeTick, DecodedSymbol, Point, SymbolFormat};
use crate::backends::camera::types::{PixelFormat, VideoFrame};
use crate::backends::camera::{BackendResult, CaptureStream, PlatformError};
use crate::constants::{decode, timing};
use crate::session::DecodeGate;
use async_trait::async_trait;
use image::GrayImage;
use image::imageops::{self, FilterType};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Outcome of decoding one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDecode {
    pub symbols: Vec<DecodedSymbol>,
    /// Grids that were located but failed to decode
    pub failures: Vec<String>,
}

impl FrameDecode {
    /// Ticks to report for this frame
    pub fn into_ticks(self) -> Vec<DecodeTick> {
        if self.symbols.is_empty() && self.failures.is_empty() {
            return vec![DecodeTick::NoMatch];
        }
        let mut ticks: Vec<DecodeTick> = self.symbols.into_iter().map(DecodeTick::Match).collect();
        ticks.extend(self.failures.into_iter().map(DecodeTick::EngineError));
        ticks
    }
}

/// QR code detector
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    pub fn new() -> Self {
        Self {
            max_dimension: decode::MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Decode a frame off the async runtime
    pub async fn detect(&self, frame: Arc<VideoFrame>) -> FrameDecode {
        let max_dim = self.max_dimension;

        tokio::task::spawn_blocking(move || detect_sync(&frame, max_dim))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "QR detection task panicked");
                FrameDecode {
                    symbols: Vec::new(),
                    failures: vec![format!("detection task failed: {}", e)],
                }
            })
    }

    /// Decode a luma image directly
    pub fn detect_image(&self, image: &GrayImage) -> FrameDecode {
        let (prepared, scale) = downscale(image.clone(), self.max_dimension);
        decode_luma(&prepared, scale)
    }
}

/// Synchronous QR detection (runs in a blocking task)
pub fn detect_sync(frame: &VideoFrame, max_dimension: u32) -> FrameDecode {
    let start = Instant::now();

    let Some(luma) = frame_to_luma(frame) else {
        return FrameDecode {
            symbols: Vec::new(),
            failures: vec![format!(
                "frame data too short for {}x{} stride {}",
                frame.width, frame.height, frame.stride
            )],
        };
    };
    let (prepared, scale) = downscale(luma, max_dimension);

    trace!(
        width = prepared.width(),
        height = prepared.height(),
        scale,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared luma image for decoding"
    );

    let result = decode_luma(&prepared, scale);

    if !result.symbols.is_empty() {
        debug!(
            count = result.symbols.len(),
            total_ms = start.elapsed().as_millis(),
            "QR detection found codes"
        );
    }
    result
}

fn decode_luma(image: &GrayImage, scale: f32) -> FrameDecode {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| image.get_pixel(x as u32, y as u32).0[0],
    );

    let mut result = FrameDecode::default();
    for grid in prepared.detect_grids() {
        let corners = grid
            .bounds
            .iter()
            .map(|p| Point {
                x: p.x as f32 * scale,
                y: p.y as f32 * scale,
            })
            .collect();

        match grid.decode() {
            Ok((meta, content)) => {
                debug!(content = %content, version = meta.version.0, "Detected QR code");
                result.symbols.push(DecodedSymbol {
                    format: SymbolFormat::QrCode,
                    text: content,
                    corners,
                    version: Some(meta.version.0),
                    ecc_level: Some(meta.ecc_level),
                });
            }
            Err(e) => {
                debug!(error = %e, "Failed to decode QR code");
                result.failures.push(e.to_string());
            }
        }
    }
    result
}

/// Convert a frame to a tightly packed luma image, dropping stride padding
fn frame_to_luma(frame: &VideoFrame) -> Option<GrayImage> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;
    let bpp = frame.format.bytes_per_pixel();

    if width == 0 || height == 0 || stride < width * bpp {
        return None;
    }
    let needed = (height - 1) * stride + width * bpp;
    if frame.data.len() < needed {
        return None;
    }

    let mut luma = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = &frame.data[y * stride..y * stride + width * bpp];
        match frame.format {
            PixelFormat::Gray8 => luma.extend_from_slice(row),
            PixelFormat::RGBA => luma.extend(row.chunks_exact(4).map(|px| {
                // BT.601 integer approximation
                ((77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32) >> 8) as u8
            })),
        }
    }

    GrayImage::from_raw(frame.width, frame.height, luma)
}

/// Downscale so neither side exceeds `max_dimension`. Returns the image and
/// the factor mapping processed coordinates back to the original.
fn downscale(image: GrayImage, max_dimension: u32) -> (GrayImage, f32) {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return (image, 1.0);
    }

    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    (
        imageops::resize(&image, new_width, new_height, FilterType::Triangle),
        scale,
    )
}

/// Decode engine running [`QrDetector`] over a stream's frame feed
#[derive(Debug, Clone)]
pub struct QrDecodeEngine {
    detector: QrDetector,
    interval: Duration,
}

impl Default for QrDecodeEngine {
    fn default() -> Self {
        Self::new(QrDetector::new(), timing::DECODE_INTERVAL)
    }
}

impl QrDecodeEngine {
    pub fn new(detector: QrDetector, interval: Duration) -> Self {
        Self { detector, interval }
    }
}

/// Handle for a running [`QrDecodeEngine`] loop
pub struct QrDecodeHandle {
    controller: DecodeLoopController,
}

#[async_trait]
impl DecodeHandle for QrDecodeHandle {
    fn stop(&self) {
        self.controller.stop();
    }
}

#[async_trait]
impl<S: CaptureStream> DecodeEngine<S> for QrDecodeEngine {
    type Handle = QrDecodeHandle;

    async fn start(&self, stream: Arc<S>, gate: DecodeGate) -> BackendResult<Self::Handle> {
        let rx = stream
            .subscribe_frames()
            .ok_or_else(|| PlatformError::NotSupported("stream has no frame feed".into()))?;

        let detector = self.detector.clone();
        let interval = self.interval;
        let mut last_processed: Option<Instant> = None;

        let controller = DecodeLoopController::start("qr-decode", rx, move |frame| {
            // Sample frames so decoding never queues behind the camera
            let due = last_processed.is_none_or(|t| t.elapsed() >= interval);
            if due {
                last_processed = Some(Instant::now());
            }
            let detector = detector.clone();
            let gate = gate.clone();
            async move {
                if !due || !gate.is_open() {
                    return LoopAction::Continue;
                }
                for tick in detector.detect(frame).await.into_ticks() {
                    gate.on_tick(tick);
                }
                LoopAction::Continue
            }
        });

        debug!(interval_ms = interval.as_millis(), "QR decode engine attached to stream");

        Ok(QrDecodeHandle { controller })
    }
}
