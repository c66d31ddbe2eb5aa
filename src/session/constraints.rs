// SPDX-License-Identifier: GPL-3.0-only

//! Capture acquisition with ordered constraint fallback
//!
//! An [`AcquirePlan`] expands into up to three strategies, from most to least
//! specific. [`acquire_with_fallback`] walks them in order and moves on only
//! when the platform rejects a request as overconstrained or not found.

use crate::backends::camera::types::{AcquireError, FacingMode, StreamConstraints};
use crate::backends::camera::CameraPlatform;
use crate::errors::SessionError;
use tracing::{debug, info, warn};

/// One acquisition attempt shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStrategy {
    /// Exact device id with resolution/frame-rate hints
    ExactDevice,
    /// Facing-mode hint only, same hints
    FacingOnly,
    /// Any video source
    AnyVideo,
}

/// Resolution and frame-rate hints attached to the first two strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureHints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// What the caller wants to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquirePlan {
    pub device_id: Option<String>,
    pub facing: Option<FacingMode>,
    pub hints: CaptureHints,
}

impl AcquirePlan {
    /// Ordered strategies. Tiers whose input is missing are skipped; the
    /// unconstrained tier is always last.
    pub fn strategies(&self) -> Vec<(AcquireStrategy, StreamConstraints)> {
        let hints = self.hints;
        let mut strategies = Vec::with_capacity(3);
        if let Some(id) = &self.device_id {
            strategies.push((
                AcquireStrategy::ExactDevice,
                StreamConstraints::exact_device(id.clone()).with_hints(
                    hints.width,
                    hints.height,
                    hints.frame_rate,
                ),
            ));
        }
        if let Some(facing) = self.facing {
            strategies.push((
                AcquireStrategy::FacingOnly,
                StreamConstraints::facing(facing).with_hints(
                    hints.width,
                    hints.height,
                    hints.frame_rate,
                ),
            ));
        }
        strategies.push((AcquireStrategy::AnyVideo, StreamConstraints::any_video()));
        strategies
    }
}

/// Walk the plan's strategies until one yields a stream
pub async fn acquire_with_fallback<P: CameraPlatform>(
    platform: &P,
    plan: &AcquirePlan,
) -> Result<(P::Stream, AcquireStrategy), SessionError> {
    let mut last_error: Option<AcquireError> = None;

    for (strategy, constraints) in plan.strategies() {
        debug!(?strategy, constraints = %constraints, "Requesting capture stream");
        match platform.acquire(&constraints).await {
            Ok(stream) => {
                info!(?strategy, constraints = %constraints, "Capture stream acquired");
                return Ok((stream, strategy));
            }
            Err(e) if e.allows_fallback() => {
                debug!(?strategy, error = %e, "Strategy rejected, trying next");
                last_error = Some(e);
            }
            Err(e) => {
                warn!(?strategy, error = %e, "Capture request failed");
                return Err(match e {
                    AcquireError::NotAllowed(_) => SessionError::PermissionDenied,
                    AcquireError::NotSupported(_) => SessionError::UnsupportedEnvironment,
                    other => SessionError::StreamAcquisitionFailed(other.to_string()),
                });
            }
        }
    }

    let reason = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no capture strategy available".to_string());
    warn!(reason = %reason, "All capture strategies exhausted");
    Err(SessionError::StreamAcquisitionFailed(format!(
        "all capture strategies failed (last: {})",
        reason
    )))
}
