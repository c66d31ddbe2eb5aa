// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera session

use crate::backends::camera::types::{AcquireError, PlatformError};
use std::fmt;

/// Result type alias using SessionError
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-level error taxonomy
///
/// Structural failures (no hardware, permission denied, every acquisition
/// strategy exhausted) are surfaced to the caller once. Transient conditions
/// are absorbed where they occur and only degrade feature availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Camera access was refused by the user or the platform
    PermissionDenied,
    /// Permission is fine but no video input exists
    NoCameraFound,
    /// The host exposes no camera API at all
    UnsupportedEnvironment,
    /// A single acquisition strategy was rejected as overconstrained.
    /// Recovered internally by the fallback driver.
    OverconstrainedRequest(String),
    /// Every acquisition strategy failed, or a non-recoverable failure occurred
    StreamAcquisitionFailed(String),
    /// No torch control path succeeded
    TorchUnsupported,
    /// Routine "no symbol in this frame" from the decoder. Never surfaced.
    DecodeServiceTransient,
}

impl SessionError {
    /// Whether this error should reach the caller's error channel
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            SessionError::OverconstrainedRequest(_) | SessionError::DecodeServiceTransient
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::PermissionDenied => write!(
                f,
                "Camera access was denied. Allow camera access in your browser or system settings and retry."
            ),
            SessionError::NoCameraFound => write!(
                f,
                "No camera found. Connect a camera or check that no other application is using it, then retry."
            ),
            SessionError::UnsupportedEnvironment => write!(
                f,
                "Camera access is not supported in this environment. Use a secure context with camera support."
            ),
            SessionError::OverconstrainedRequest(msg) => {
                write!(f, "Camera rejected the requested settings: {}", msg)
            }
            SessionError::StreamAcquisitionFailed(msg) => {
                write!(f, "Could not start the camera: {}", msg)
            }
            SessionError::TorchUnsupported => write!(f, "Torch is not supported on this camera"),
            SessionError::DecodeServiceTransient => write!(f, "No code found in frame"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<AcquireError> for SessionError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::Overconstrained(msg) => SessionError::OverconstrainedRequest(msg),
            AcquireError::NotFound(msg) => SessionError::StreamAcquisitionFailed(msg),
            AcquireError::NotAllowed(_) => SessionError::PermissionDenied,
            AcquireError::NotSupported(_) => SessionError::UnsupportedEnvironment,
            AcquireError::Other(msg) => SessionError::StreamAcquisitionFailed(msg),
        }
    }
}

impl From<PlatformError> for SessionError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotSupported(_) => SessionError::UnsupportedEnvironment,
            other => SessionError::StreamAcquisitionFailed(other.to_string()),
        }
    }
}
