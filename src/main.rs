// SPDX-License-Identifier: GPL-3.0-only

use camera_scanner::session::CameraMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-scanner")]
#[command(about = "Camera session manager with live QR decoding")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and classify cameras
    List {
        /// JSON device list (default: a three-lens phone)
        #[arg(short, long)]
        devices: Option<PathBuf>,
    },

    /// Decode QR codes from an image file
    Decode {
        /// Image to decode
        image: PathBuf,

        /// Config file (default: ~/.config/camera-scanner/config.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a scanning session fed by a still image
    Scan {
        /// Image replayed as the camera feed
        #[arg(short, long)]
        image: PathBuf,

        /// Camera mode: back-main, back-wide, front or auto
        #[arg(short, long, default_value = "auto")]
        mode: CameraMode,

        /// Give up after this many seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// JSON device list (default: a three-lens phone)
        #[arg(short, long)]
        devices: Option<PathBuf>,

        /// Config file (default: ~/.config/camera-scanner/config.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=camera_scanner=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { devices } => cli::list_cameras(devices.as_deref()),
        Commands::Decode { image, config } => cli::decode_image(&image, config.as_deref()),
        Commands::Scan {
            image,
            mode,
            timeout,
            devices,
            config,
        } => cli::scan(
            &image,
            mode,
            timeout,
            devices.as_deref(),
            config.as_deref(),
        ),
    }
}
