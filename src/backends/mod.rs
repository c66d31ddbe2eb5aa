// SPDX-License-Identifier: GPL-3.0-only

//! Platform abstraction layer
//!
//! - [`camera`]: traits and types the session consumes from a camera host
//! - [`virtual_camera`]: an in-memory host for the CLI and for tests

pub mod camera;
pub mod virtual_camera;
