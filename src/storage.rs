// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for snapshots of decoded frames

use crate::media::DecodableImage;
use std::path::PathBuf;
use tracing::{debug, info};

/// File extension for an image's format
fn extension(image: &DecodableImage) -> &'static str {
    image
        .format()
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("img")
}

/// Save the image a code was decoded from
///
/// Generates a timestamped filename in `output_dir`, creating the directory
/// if needed.
pub async fn save_snapshot(image: &DecodableImage, output_dir: PathBuf) -> std::io::Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
    let filename = format!("SCAN_{}.{}", timestamp, extension(image));
    let filepath = output_dir.join(&filename);

    debug!(path = %filepath.display(), size = image.as_bytes().len(), "Saving snapshot");

    tokio::fs::create_dir_all(&output_dir).await?;
    tokio::fs::write(&filepath, image.as_bytes()).await?;

    info!(path = %filepath.display(), "Snapshot saved");
    Ok(filepath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    #[tokio::test]
    async fn test_save_snapshot_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let image = DecodableImage::from_parts(vec![0xFF, 0xD8, 0xFF], 1, 1, ImageFormat::Jpeg);

        let path = save_snapshot(&image, dir.path().join("snaps")).await.unwrap();

        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }
}
