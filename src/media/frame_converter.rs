// SPDX-License-Identifier: GPL-3.0-only

//! Captured frame to compressed image conversion
//!
//! Camera pipelines hand out raw YUV planes that the decoders cannot read
//! directly. This module copies a frame's pixels into an owned RGB raster
//! and compresses it as JPEG covering the full frame rectangle.

use crate::backends::camera::types::{CapturedFrame, PixelFormat};
use crate::constants::JPEG_QUALITY;
use crate::errors::ConvertError;
use crate::media::DecodableImage;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat, RgbImage};
use tracing::trace;

/// Converts captured frames into decodable JPEG images
#[derive(Debug, Clone, Copy)]
pub struct FrameConverter {
    /// JPEG quality (1-100)
    quality: u8,
}

impl Default for FrameConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameConverter {
    /// Create a converter that encodes at maximum quality
    pub fn new() -> Self {
        Self {
            quality: JPEG_QUALITY,
        }
    }

    /// Create a converter with a custom JPEG quality
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Convert a captured frame into an owned JPEG image
    ///
    /// The returned image never references the frame's buffer, so the
    /// pipeline may reuse it as soon as this returns.
    pub fn convert(&self, frame: &CapturedFrame<'_>) -> Result<DecodableImage, ConvertError> {
        let start = std::time::Instant::now();

        validate(frame)?;
        let rgb = frame_to_rgb(frame);
        let conversion_time = start.elapsed();

        let data = encode_jpeg(&rgb, self.quality)?;

        trace!(
            width = frame.width,
            height = frame.height,
            format = %frame.format,
            size = data.len(),
            conversion_us = conversion_time.as_micros(),
            total_us = start.elapsed().as_micros(),
            "Converted frame to JPEG"
        );

        Ok(DecodableImage::from_parts(
            data,
            frame.width,
            frame.height,
            ImageFormat::Jpeg,
        ))
    }
}

/// Check that dimensions are non-zero and the buffer covers the layout
fn validate(frame: &CapturedFrame<'_>) -> Result<(), ConvertError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(ConvertError::InvalidDimensions {
            width: frame.width,
            height: frame.height,
        });
    }

    let min_stride = frame.format.default_stride(frame.width);
    if frame.stride < min_stride {
        return Err(ConvertError::UnsupportedFormat(format!(
            "{} stride {} is smaller than row length {}",
            frame.format, frame.stride, min_stride
        )));
    }

    let expected = frame
        .format
        .min_buffer_len(frame.width, frame.height, frame.stride);
    if frame.data.len() < expected {
        return Err(ConvertError::BufferTooSmall {
            expected,
            actual: frame.data.len(),
        });
    }

    Ok(())
}

/// Copy a validated frame into an owned RGB raster
fn frame_to_rgb(frame: &CapturedFrame<'_>) -> RgbImage {
    match frame.format {
        PixelFormat::Nv21 => semi_planar_to_rgb(frame, true),
        PixelFormat::Nv12 => semi_planar_to_rgb(frame, false),
        PixelFormat::Yuyv => yuyv_to_rgb(frame),
        PixelFormat::Gray8 => gray_to_rgb(frame),
    }
}

/// Convert one YUV sample to RGB (BT.601)
#[inline]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    [r, g, b]
}

/// NV21/NV12: full-resolution Y plane followed by an interleaved chroma
/// plane at half resolution in both directions. `vu_order` selects NV21.
fn semi_planar_to_rgb(frame: &CapturedFrame<'_>, vu_order: bool) -> RgbImage {
    let stride = frame.stride as usize;
    let chroma_start = stride * frame.height as usize;
    let data = frame.data;

    RgbImage::from_fn(frame.width, frame.height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let luma = data[y * stride + x];

        let chroma = chroma_start + (y / 2) * stride + (x / 2) * 2;
        let (first, second) = (data[chroma], data[chroma + 1]);
        let (u, v) = if vu_order {
            (second, first)
        } else {
            (first, second)
        };
        image::Rgb(yuv_to_rgb(luma, u, v))
    })
}

/// YUYV: Y0 U Y1 V, two pixels per 4-byte group
fn yuyv_to_rgb(frame: &CapturedFrame<'_>) -> RgbImage {
    let stride = frame.stride as usize;
    let data = frame.data;

    RgbImage::from_fn(frame.width, frame.height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let group = y * stride + (x / 2) * 4;
        let luma = if x % 2 == 0 {
            data[group]
        } else {
            data[group + 2]
        };
        image::Rgb(yuv_to_rgb(luma, data[group + 1], data[group + 3]))
    })
}

fn gray_to_rgb(frame: &CapturedFrame<'_>) -> RgbImage {
    let stride = frame.stride as usize;
    let data = frame.data;

    RgbImage::from_fn(frame.width, frame.height, |x, y| {
        let luma = data[y as usize * stride + x as usize];
        image::Rgb([luma, luma, luma])
    })
}

/// Encode an RGB raster as JPEG
fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ConvertError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);

    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv_to_rgb_neutral_chroma_is_gray() {
        assert_eq!(yuv_to_rgb(0, 128, 128), [0, 0, 0]);
        assert_eq!(yuv_to_rgb(255, 128, 128), [255, 255, 255]);
        assert_eq!(yuv_to_rgb(90, 128, 128), [90, 90, 90]);
    }

    #[test]
    fn test_nv21_chroma_order() {
        // 2x2 frame: one chroma pair. NV21 stores V first.
        let data = [100, 100, 100, 100, 200, 60];
        let frame = CapturedFrame::new(&data, 2, 2, PixelFormat::Nv21);
        let rgb = frame_to_rgb(&frame);
        // V=200 pushes red up, U=60 pulls blue down
        let px = rgb.get_pixel(0, 0);
        assert!(px[0] > px[2], "expected red > blue, got {:?}", px);

        let frame = CapturedFrame::new(&data, 2, 2, PixelFormat::Nv12);
        let rgb = frame_to_rgb(&frame);
        let px = rgb.get_pixel(0, 0);
        assert!(px[2] > px[0], "expected blue > red, got {:?}", px);
    }

    #[test]
    fn test_yuyv_picks_per_pixel_luma() {
        let data = [10, 128, 250, 128];
        let frame = CapturedFrame::new(&data, 2, 1, PixelFormat::Yuyv);
        let rgb = frame_to_rgb(&frame);
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 10, 10]);
        assert_eq!(rgb.get_pixel(1, 0).0, [250, 250, 250]);
    }

    #[test]
    fn test_gray_respects_stride() {
        // 2x2 with one byte of padding per row
        let data = [1, 2, 0, 3, 4, 0];
        let mut frame = CapturedFrame::new(&data, 2, 2, PixelFormat::Gray8);
        frame.stride = 3;
        let rgb = frame_to_rgb(&frame);
        assert_eq!(rgb.get_pixel(1, 1).0, [4, 4, 4]);
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let frame = CapturedFrame::new(&[], 0, 4, PixelFormat::Nv21);
        assert_eq!(
            validate(&frame),
            Err(ConvertError::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn test_validate_rejects_short_buffer() {
        let data = vec![0u8; 16];
        let frame = CapturedFrame::new(&data, 4, 4, PixelFormat::Nv21);
        assert_eq!(
            validate(&frame),
            Err(ConvertError::BufferTooSmall {
                expected: 24,
                actual: 16
            })
        );
    }

    #[test]
    fn test_with_quality_clamps() {
        assert_eq!(FrameConverter::with_quality(0).quality(), 1);
        assert_eq!(FrameConverter::with_quality(250).quality(), 100);
        assert_eq!(FrameConverter::new().quality(), JPEG_QUALITY);
    }
}
