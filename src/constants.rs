// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Session timing
pub mod timing {
    use super::Duration;

    /// Minimum spacing between two accepted scan results
    pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

    /// Haptic pulse length on an accepted result
    pub const HAPTIC_PULSE: Duration = Duration::from_millis(50);

    /// Upper bound on waiting for the first frame before probing capabilities
    pub const PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

    /// Delay before probing when the platform has no first-frame signal
    pub const PROBE_FALLBACK_DELAY: Duration = Duration::from_millis(300);

    /// Minimum spacing between decoded frames
    pub const DECODE_INTERVAL: Duration = Duration::from_millis(100);
}

/// Capture hints sent with device and facing-mode requests
pub mod capture {
    pub const PREFERRED_WIDTH: u32 = 1280;
    pub const PREFERRED_HEIGHT: u32 = 720;
    pub const PREFERRED_FRAME_RATE: u32 = 30;

    /// Zoom factor treated as the main lens focal length
    pub const MAIN_LENS_ZOOM: f64 = 1.0;
}

/// Decoder tuning
pub mod decode {
    /// Frames are downscaled so neither side exceeds this before decoding
    pub const MAX_DIMENSION: u32 = 640;

    /// Frame channel depth between a stream and its decode loop
    pub const FRAME_CHANNEL_CAPACITY: usize = 2;
}

/// Label tokens used for lens classification (matched lowercase)
pub mod labels {
    pub const FRONT: &[&str] = &["front", "user", "face"];
    pub const BACK: &[&str] = &["back", "rear", "environment"];
    pub const WIDE: &[&str] = &["ultra", "wide", "0.5x"];
}

/// Supported image extensions for still-image frame sources
pub mod file_formats {
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}
