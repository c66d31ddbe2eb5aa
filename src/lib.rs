// SPDX-License-Identifier: GPL-3.0-only

//! Camera Scanner - camera session management with live QR decoding
//!
//! The library negotiates which physical camera to use, starts and stops
//! capture streams without leaking device handles, copes with permission and
//! hardware variability, and keeps an observable state snapshot consistent
//! with the live hardware.
//!
//! # Architecture
//!
//! - [`backends`]: platform traits ([`backends::camera`]) and an in-memory
//!   platform ([`backends::virtual_camera`])
//! - [`session`]: the session manager, device catalog, constraint fallback,
//!   capability probe, torch control and decode gate
//! - [`decoder`]: the decoding-service boundary and the bundled QR engine
//! - [`config`]: read-only settings
//!
//! # Example
//!
//! ```ignore
//! let platform = VirtualPlatform::new(VirtualDevice::three_lens_phone());
//! let (session, mut events) =
//!     CameraSession::new(platform, QrDecodeEngine::default(), ScannerConfig::default());
//! session.initialize().await?;
//! while let Some(SessionEvent::Result(result)) = events.recv().await {
//!     println!("{}", result.text);
//! }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod errors;
pub mod session;

// Re-export commonly used types
pub use config::ScannerConfig;
pub use errors::{SessionError, SessionResult};
pub use session::{CameraMode, CameraSession, SessionEvent, SessionSnapshot};
