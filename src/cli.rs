// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Scanning a photo
//! - Scanning continuously from a camera

use qrscan::backends::camera::{
    CaptureFormat, CaptureSource, PixelFormat, ReplaySource, V4l2Source, list_devices,
};
use qrscan::backends::permissions::DevicePermissions;
use qrscan::gallery::{self, PhotoOutcome};
use qrscan::notify::TerminalNotifier;
use qrscan::scan_loop::{LoopSettings, ScanLoop};
use qrscan::scanner::{LocalDecoder, ScanOptions};
use qrscan::{Config, ScanError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = list_devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  {} ({})", camera.name, camera.path);
        let formats: Vec<String> = camera.formats.iter().map(PixelFormat::to_string).collect();
        println!("      Driver: {}", camera.driver);
        println!("      Formats: {}", formats.join(", "));
        println!();
    }

    Ok(())
}

/// Scan a single photo, picking one interactively when no path is given
///
/// Exits with a failure code when the photo holds no code; the notifier
/// has already said so.
pub fn scan_photo(path: Option<PathBuf>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(scan_photo_async(path, config))
}

async fn scan_photo_async(
    path: Option<PathBuf>,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let path = match path {
        Some(path) => path,
        None => match gallery::pick_image().await {
            Some(path) => path,
            None => {
                println!("No photo selected.");
                return Ok(ExitCode::SUCCESS);
            }
        },
    };

    let storage_root = path.parent().map(|p| p.to_path_buf());
    let permissions = DevicePermissions::new(None, storage_root);
    let options = ScanOptions::new(config.formats.iter().copied());

    let outcome = gallery::scan_photo(
        Arc::new(LocalDecoder::new()),
        &TerminalNotifier,
        &permissions,
        &path,
        &options,
    )
    .await?;

    match outcome {
        PhotoOutcome::Found(_) => Ok(ExitCode::SUCCESS),
        PhotoOutcome::NoCode => Ok(ExitCode::FAILURE),
    }
}

/// Run the camera scan loop until Ctrl+C
pub fn scan_camera(
    device: Option<String>,
    delay_ms: Option<u64>,
    snapshot_dir: Option<PathBuf>,
    replay: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();
    if let Some(delay_ms) = delay_ms {
        config.resume_delay_ms = delay_ms;
    }
    if snapshot_dir.is_some() {
        config.snapshot_dir = snapshot_dir;
    }
    if device.is_some() {
        config.camera_device = device;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    let settings = LoopSettings::from_config(&config);
    let decoder = LocalDecoder::with_max_dimension(config.max_frame_dimension);

    if let Some(replay) = replay {
        println!("Replaying {} (press Ctrl+C to stop)", replay.display());
        let source = ReplaySource::new(replay);
        let permissions = DevicePermissions::new(None, None);
        return rt.block_on(run_loop(decoder, source, permissions, settings, shutdown_rx));
    }

    let format = CaptureFormat {
        width: config.capture_width,
        height: config.capture_height,
        pixel_format: PixelFormat::Nv21,
    };
    let source = match config.camera_device.clone() {
        Some(path) => V4l2Source::new(path, format),
        None => V4l2Source::first_available(format).map_err(ScanError::from)?,
    };
    let permissions = DevicePermissions::for_camera(source.device_path());
    println!("Scanning with {} (press Ctrl+C to stop)", source.device_path());

    rt.block_on(run_loop(decoder, source, permissions, settings, shutdown_rx))
}

async fn run_loop<S: CaptureSource>(
    decoder: LocalDecoder,
    source: S,
    permissions: DevicePermissions,
    settings: LoopSettings,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scan_loop = ScanLoop::new(
        Arc::new(decoder),
        source,
        TerminalNotifier,
        permissions,
        settings,
    );

    let started = Instant::now();
    let summary = scan_loop.run(shutdown).await?;

    eprintln!(
        "Scanned {} code(s) from {} frame(s) in {}s",
        summary.scans.len(),
        summary.stats.frames,
        started.elapsed().as_secs()
    );
    Ok(())
}
