// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser)]
#[command(name = "qrscan")]
#[command(about = "Scan QR and DataMatrix codes from photos or a live camera")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a code in a photo
    Photo {
        /// Image to scan (opens a file picker when omitted)
        path: Option<PathBuf>,
    },

    /// Scan codes continuously from a camera until Ctrl+C
    Camera {
        /// V4L2 device node (default: configured device or first camera)
        #[arg(short, long)]
        device: Option<String>,

        /// Pause after each scan in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Save the frame of every scanned code into this directory
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Replay an image file instead of opening a camera
        #[arg(long, conflicts_with = "device")]
        replay: Option<PathBuf>,
    },

    /// List available cameras
    List,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=qrscan=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Photo { path } => cli::scan_photo(path),
        Commands::Camera {
            device,
            delay_ms,
            snapshot_dir,
            replay,
        } => cli::scan_camera(device, delay_ms, snapshot_dir, replay).map(|()| ExitCode::SUCCESS),
        Commands::List => cli::list_cameras().map(|()| ExitCode::SUCCESS),
    }
}
