// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! Every command runs against the virtual platform:
//! - Listing and classifying cameras
//! - Decoding QR codes from an image file
//! - Running a full scanning session fed by a still image

use camera_scanner::backends::virtual_camera::{
    VirtualDevice, VirtualPlatform, load_image_as_frame,
};
use camera_scanner::config::ScannerConfig;
use camera_scanner::decoder::{QrDecodeEngine, QrDetector};
use camera_scanner::session::{self, CameraMode, CameraSession, SessionEvent};
use std::path::Path;
use std::time::Duration;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

fn load_devices(path: Option<&Path>) -> Result<Vec<VirtualDevice>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(VirtualDevice::load_list(path)?),
        None => Ok(VirtualDevice::three_lens_phone()),
    }
}

/// Discover cameras and print their classification
pub fn list_cameras(devices: Option<&Path>) -> CliResult {
    let platform = VirtualPlatform::new(load_devices(devices)?);
    let discovery = runtime()?
        .block_on(session::catalog::discover(&platform))
        .map_err(|e| e.error)?;
    let catalog = discovery.catalog;

    println!("Available cameras:");
    println!();
    for (index, device) in catalog.devices.iter().enumerate() {
        let role = match device.role {
            Some(role) => CameraMode::from(role).display_name(),
            None => "Unknown",
        };
        let marker = if catalog.recommended.as_deref() == Some(device.id.as_str()) {
            " (recommended)"
        } else {
            ""
        };
        println!("  [{}] {} - {}{}", index, device.label, role, marker);
        println!("      Id: {}", device.id);
    }
    println!();
    println!("Permission: {:?}", discovery.permission);

    Ok(())
}

/// Decode every QR code in an image file
pub fn decode_image(path: &Path, config_path: Option<&Path>) -> CliResult {
    let config = ScannerConfig::load_or_default(config_path)?;
    let image = image::open(path)
        .map_err(|e| format!("Failed to load image '{}': {}", path.display(), e))?
        .to_luma8();

    let decoded = QrDetector::with_max_dimension(config.decode_max_dimension).detect_image(&image);
    if decoded.symbols.is_empty() {
        println!("No QR code found.");
    }
    for symbol in &decoded.symbols {
        println!("{}", symbol.text);
    }
    for failure in &decoded.failures {
        eprintln!("Unreadable code: {}", failure);
    }

    Ok(())
}

/// Run a session on the virtual platform until the first result
pub fn scan(
    image: &Path,
    mode: CameraMode,
    timeout_secs: u64,
    devices: Option<&Path>,
    config_path: Option<&Path>,
) -> CliResult {
    let mut config = ScannerConfig::load_or_default(config_path)?;
    config.auto_start = true;
    config.initial_mode = mode;

    let frame = load_image_as_frame(image)?;
    let platform = VirtualPlatform::new(load_devices(devices)?).with_frame(frame);
    let engine = QrDecodeEngine::new(
        QrDetector::with_max_dimension(config.decode_max_dimension),
        config.decode_interval(),
    );

    runtime()?.block_on(async move {
        let (session, mut events) = CameraSession::new(platform, engine, config);
        session.initialize().await?;

        let snapshot = session.snapshot();
        println!(
            "Scanning with {} ({})",
            snapshot.selected_device_id.as_deref().unwrap_or("unknown camera"),
            snapshot.mode.display_name()
        );

        let outcome: CliResult = tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Result(result)) => {
                    println!("{}", result.text);
                    Ok(())
                }
                Some(SessionEvent::Error(error)) => Err(error.into()),
                None => Err("session closed".into()),
            },
            _ = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
                Err(format!("No QR code found within {}s", timeout_secs).into())
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted.");
                Ok(())
            }
        };

        session.teardown();
        outcome
    })
}
