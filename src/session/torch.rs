// SPDX-License-Identifier: GPL-3.0-only

//! Torch control
//!
//! Platforms expose the torch in different places. Each method is tried in
//! order until one reports success.

use crate::backends::camera::CaptureStream;
use crate::backends::camera::types::{FillLightMode, TrackConstraint};
use crate::decoder::DecodeHandle;
use crate::errors::SessionError;
use tracing::{debug, info};

/// Path that switched the torch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorchMethod {
    /// The decoding service's own switch
    DecoderNative,
    /// `{torch}` constraint on the track
    TrackConstraint,
    /// Photo fill-light mode
    FillLight,
}

/// Drive the torch to `on` through the first method that works
pub async fn set_torch<S, H>(stream: &S, decoder: &H, on: bool) -> Result<TorchMethod, SessionError>
where
    S: CaptureStream + ?Sized,
    H: DecodeHandle + ?Sized,
{
    if decoder.supports_torch() {
        match decoder.set_torch(on).await {
            Ok(()) => return Ok(finish(TorchMethod::DecoderNative, on)),
            Err(e) => debug!(error = %e, "Decoder torch switch failed"),
        }
    }

    match stream.apply_constraints(&[TrackConstraint::Torch(on)]).await {
        Ok(()) => return Ok(finish(TorchMethod::TrackConstraint, on)),
        Err(e) => debug!(error = %e, "Torch constraint rejected"),
    }

    let mode = if on {
        FillLightMode::Flash
    } else {
        FillLightMode::Off
    };
    match stream.set_fill_light_mode(mode).await {
        Ok(()) => return Ok(finish(TorchMethod::FillLight, on)),
        Err(e) => debug!(error = %e, "Fill light mode rejected"),
    }

    Err(SessionError::TorchUnsupported)
}

fn finish(method: TorchMethod, on: bool) -> TorchMethod {
    info!(?method, on, "Torch switched");
    method
}
