// SPDX-License-Identifier: GPL-3.0-only

//! Compressed raster image handed to the decode service

use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, ImageResult};
use std::io::Cursor;

/// An owned, compressed raster image ready for decoding
///
/// Produced either by the frame converter (JPEG) or by loading a picked
/// photo as-is. The bytes never borrow from a camera buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodableImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: ImageFormat,
}

impl DecodableImage {
    /// Wrap already-encoded bytes whose dimensions are known
    pub(crate) fn from_parts(data: Vec<u8>, width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// Wrap encoded bytes of an unknown format
    ///
    /// Sniffs the format from the header and reads the dimensions without
    /// decoding the whole image.
    pub fn from_encoded(data: Vec<u8>) -> ImageResult<Self> {
        let reader = ImageReader::new(Cursor::new(data.as_slice())).with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            image::ImageError::Unsupported(image::error::UnsupportedError::from_format_and_kind(
                image::error::ImageFormatHint::Unknown,
                image::error::UnsupportedErrorKind::Format(image::error::ImageFormatHint::Unknown),
            ))
        })?;
        let (width, height) = reader.into_dimensions()?;
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Decode the compressed data back into a raster
    pub fn decode_raster(&self) -> ImageResult<DynamicImage> {
        image::load_from_memory_with_format(&self.data, self.format)
    }

    /// Decode into an 8-bit grayscale raster
    pub fn to_luma8(&self) -> ImageResult<GrayImage> {
        Ok(self.decode_raster()?.into_luma8())
    }
}

impl std::fmt::Debug for DecodableImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DecodableImage({:?}, {}x{}, {} bytes)",
            self.format,
            self.width,
            self.height,
            self.data.len()
        )
    }
}
