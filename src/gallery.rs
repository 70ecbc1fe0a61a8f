// SPDX-License-Identifier: GPL-3.0-only

//! One-shot photo scanning
//!
//! Loads a user-chosen picture, runs the decoder on it once and reports the
//! first code found. Unlike the camera loop there is no retry and no
//! downscaling: photos are decoded at full resolution.

use crate::backends::permissions::{Permission, PermissionAuthority, PermissionStatus};
use crate::constants::file_formats::{IMAGE_EXTENSIONS, is_image_extension};
use crate::errors::{DecodeError, ScanError};
use crate::media::DecodableImage;
use crate::notify::Notifier;
use crate::scanner::{Decoder, Scan, ScanOptions, first_success};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of scanning a single photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoOutcome {
    Found(Scan),
    /// The image was readable but contained no code
    NoCode,
}

/// Read an image file and make sure it can be decoded
///
/// Only files with one of the picker's image extensions are accepted.
pub async fn load_image(path: &Path) -> Result<DecodableImage, ScanError> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    if !is_image_extension(extension) {
        return Err(ScanError::ImageLoad(format!(
            "{}: not a supported image type",
            path.display()
        )));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ScanError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    let image = DecodableImage::from_encoded(bytes)
        .map_err(|e| ScanError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        format = ?image.format(),
        "Loaded photo"
    );
    Ok(image)
}

/// Decode a loaded photo once
pub fn scan_image<D: Decoder + ?Sized>(
    decoder: &D,
    image: &DecodableImage,
    options: &ScanOptions,
) -> Result<PhotoOutcome, ScanError> {
    let scans = decoder.decode(image, options)?;
    Ok(match first_success(scans) {
        Some(scan) => PhotoOutcome::Found(scan),
        None => PhotoOutcome::NoCode,
    })
}

/// Full photo flow: permission check, load, decode, notify
///
/// Decoding a full-resolution photo is slow, so it runs on a blocking task.
pub async fn scan_photo<D, N, P>(
    decoder: Arc<D>,
    notifier: &N,
    permissions: &P,
    path: &Path,
    options: &ScanOptions,
) -> Result<PhotoOutcome, ScanError>
where
    D: Decoder + ?Sized + 'static,
    N: Notifier + ?Sized,
    P: PermissionAuthority + ?Sized,
{
    if permissions.check(Permission::Storage) != PermissionStatus::Granted {
        warn!(path = %path.display(), "Storage permission denied");
        notifier.show_message("Storage access is required to scan photos");
        return Err(ScanError::PermissionDenied);
    }

    let result = match load_image(path).await {
        Ok(image) => {
            let options = options.clone();
            tokio::task::spawn_blocking(move || scan_image(&*decoder, &image, &options))
                .await
                .unwrap_or_else(|e| {
                    Err(ScanError::Decode(DecodeError::Unavailable(format!(
                        "decode task failed: {}",
                        e
                    ))))
                })
        }
        Err(e) => Err(e),
    };

    match &result {
        Ok(PhotoOutcome::Found(scan)) => {
            info!(path = %path.display(), format = %scan.format, "Code found in photo");
            notifier.show_scan(scan);
        }
        Ok(PhotoOutcome::NoCode) => {
            info!(path = %path.display(), "No code in photo");
            notifier.show_message("No code found");
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Photo scan failed");
            notifier.show_message(&e.to_string());
        }
    }

    result
}

/// Let the user pick a photo with the desktop file dialog
///
/// Returns `None` when the dialog is cancelled.
pub async fn pick_image() -> Option<PathBuf> {
    let mut dialog = rfd::AsyncFileDialog::new()
        .set_title("Choose a photo to scan")
        .add_filter("Images", IMAGE_EXTENSIONS);

    if let Some(pictures) = dirs::picture_dir() {
        dialog = dialog.set_directory(pictures);
    }

    let picked = dialog.pick_file().await.map(|file| file.path().to_path_buf());
    match &picked {
        Some(path) => debug!(path = %path.display(), "Photo picked"),
        None => debug!("Photo picker cancelled"),
    }
    picked
}
