// SPDX-License-Identifier: GPL-3.0-only

//! Decoding service boundary
//!
//! The session treats symbol decoding as an opaque service: it hands a live
//! stream and a [`DecodeGate`] to a [`DecodeEngine`], and the engine reports
//! one [`DecodeTick`] per processed frame until its handle is stopped.
//! [`QrDecodeEngine`] is the bundled engine backed by `rqrr`.

pub mod frame_loop;
pub mod qr_detector;

pub use frame_loop::DecodeLoopController;
pub use qr_detector::{QrDecodeEngine, QrDetector};

use crate::backends::camera::{BackendResult, CaptureStream, PlatformError};
use crate::session::DecodeGate;
use async_trait::async_trait;
use std::sync::Arc;

/// Symbology of a decoded symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolFormat {
    QrCode,
    Other,
}

/// A point in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Raw match artifact reported by a decoder
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSymbol {
    pub format: SymbolFormat,
    pub text: String,
    /// Symbol corners in frame coordinates, when the engine reports them
    pub corners: Vec<Point>,
    /// QR version (1-40)
    pub version: Option<usize>,
    /// Error-correction level as reported by the engine
    pub ecc_level: Option<u16>,
}

impl DecodedSymbol {
    pub fn new(format: SymbolFormat, text: impl Into<String>) -> Self {
        Self {
            format,
            text: text.into(),
            corners: Vec::new(),
            version: None,
            ecc_level: None,
        }
    }
}

/// One decoder callback for one processed frame
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeTick {
    Match(DecodedSymbol),
    /// No symbol in this frame. Routine, never an error.
    NoMatch,
    /// Something other than "no symbol" went wrong. Non-fatal.
    EngineError(String),
}

/// A running decode loop
#[async_trait]
pub trait DecodeHandle: Send + Sync + 'static {
    /// Halt the per-frame loop. Must be idempotent.
    fn stop(&self);

    /// Whether the engine exposes its own torch switch
    fn supports_torch(&self) -> bool {
        false
    }

    /// Engine-native torch switch
    async fn set_torch(&self, _on: bool) -> BackendResult<()> {
        Err(PlatformError::NotSupported("decoder torch".into()))
    }
}

/// External decoding service
#[async_trait]
pub trait DecodeEngine<S: CaptureStream>: Send + Sync + 'static {
    type Handle: DecodeHandle;

    /// Begin decoding `stream`, reporting every frame to `gate`
    async fn start(&self, stream: Arc<S>, gate: DecodeGate) -> BackendResult<Self::Handle>;
}
