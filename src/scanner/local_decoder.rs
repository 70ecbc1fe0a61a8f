// SPDX-License-Identifier: GPL-3.0-only

//! In-process barcode decoder
//!
//! QR codes are decoded with the rqrr crate, DataMatrix symbols with rxing.
//! Images are converted to grayscale and, for video frames, downscaled
//! before detection.

use super::{Decoder, Scan, ScanFormat, ScanOptions};
use crate::constants::capture::MAX_DECODE_DIMENSION;
use crate::errors::DecodeError;
use crate::media::DecodableImage;
use image::GrayImage;
use image::imageops::FilterType;
use rxing::common::HybridBinarizer;
use rxing::datamatrix::DataMatrixReader;
use rxing::{BinaryBitmap, BufferedImageLuminanceSource, DecodeHints, Reader};
use tracing::{debug, trace};

/// Barcode decoder running entirely in-process
pub struct LocalDecoder {
    /// Maximum dimension for video frames (larger frames are downscaled)
    max_dimension: u32,
}

impl Default for LocalDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalDecoder {
    /// Create a new decoder with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: MAX_DECODE_DIMENSION,
        }
    }

    /// Create a decoder with custom max dimension for video frames
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(64),
        }
    }
}

impl Decoder for LocalDecoder {
    fn decode(
        &self,
        image: &DecodableImage,
        options: &ScanOptions,
    ) -> Result<Vec<Scan>, DecodeError> {
        if options.formats.is_empty() {
            return Err(DecodeError::UnsupportedFormat(
                "no symbol formats requested".into(),
            ));
        }

        let start = std::time::Instant::now();
        let luma = image
            .to_luma8()
            .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
        let luma = if options.photo_mode {
            luma
        } else {
            downscale(luma, self.max_dimension)
        };

        let mut scans = Vec::new();
        if options.wants(ScanFormat::QrCode) {
            scans.extend(decode_qr(&luma));
        }
        if options.wants(ScanFormat::DataMatrix) {
            scans.extend(decode_data_matrix(&luma, options.photo_mode));
        }

        trace!(
            width = luma.width(),
            height = luma.height(),
            count = scans.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Decode complete"
        );

        Ok(scans)
    }
}

/// Shrink the image so its larger side is at most `max_dimension`
fn downscale(luma: GrayImage, max_dimension: u32) -> GrayImage {
    let (width, height) = luma.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return luma;
    }

    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    trace!(width, height, new_width, new_height, "Downscaling frame");
    image::imageops::resize(&luma, new_width, new_height, FilterType::Triangle)
}

fn decode_qr(luma: &GrayImage) -> Vec<Scan> {
    let width = luma.width() as usize;
    let height = luma.height() as usize;
    let raw = luma.as_raw();

    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| raw[y * width + x]);
    let grids = prepared.detect_grids();

    let mut scans = Vec::with_capacity(grids.len());
    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => {
                debug!(content = %content, "Decoded QR code");
                scans.push(Scan::new(content, ScanFormat::QrCode));
            }
            Err(e) => debug!(error = ?e, "Failed to decode QR grid"),
        }
    }
    scans
}

/// Look for a DataMatrix symbol only, so a QR code elsewhere in the
/// frame cannot shadow it
fn decode_data_matrix(luma: &GrayImage, try_harder: bool) -> Vec<Scan> {
    let source = BufferedImageLuminanceSource::new(image::DynamicImage::ImageLuma8(luma.clone()));
    let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
    let hints = DecodeHints {
        TryHarder: Some(try_harder),
        ..DecodeHints::default()
    };

    match DataMatrixReader.decode_with_hints(&mut bitmap, &hints) {
        Ok(result) => {
            debug!(content = %result.getText(), "Decoded DataMatrix");
            vec![Scan::new(result.getText(), ScanFormat::DataMatrix)]
        }
        Err(e) => {
            trace!(error = ?e, "No DataMatrix found");
            Vec::new()
        }
    }
}
