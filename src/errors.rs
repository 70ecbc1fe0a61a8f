// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner

use std::fmt;

pub use crate::backends::camera::types::BackendError;

pub type AppResult<T> = Result<T, AppError>;

/// Errors from persisting user settings
#[derive(Debug, Clone)]
pub enum AppError {
    /// The config could not be serialized or has no home
    Config(String),
    /// Reading or writing the config file failed
    Storage(String),
}

/// Errors produced while turning a captured frame into a decodable image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Width or height is zero
    InvalidDimensions { width: u32, height: u32 },
    /// Pixel buffer is shorter than the layout requires
    BufferTooSmall { expected: usize, actual: usize },
    /// Pixel layout the converter cannot interpret
    UnsupportedFormat(String),
    /// Compression of the converted raster failed
    Encoding(String),
}

/// Errors reported by a decode service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The compressed image could not be read
    InvalidImage(String),
    /// The decode service is not available
    Unavailable(String),
    /// None of the requested symbol formats are supported
    UnsupportedFormat(String),
}

/// Errors surfaced to the user by the scan flows
#[derive(Debug, Clone)]
pub enum ScanError {
    /// Camera or storage access was denied; nothing was started
    PermissionDenied,
    /// Camera pipeline could not be acquired (not retryable)
    CameraUnavailable(String),
    /// A picked photo could not be loaded
    ImageLoad(String),
    /// The decode service failed on a single image
    Decode(DecodeError),
    /// The decode service failed repeatedly and scanning was stopped
    DecoderUnavailable(DecodeError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::InvalidDimensions { width, height } => {
                write!(f, "Invalid frame dimensions: {}x{}", width, height)
            }
            ConvertError::BufferTooSmall { expected, actual } => write!(
                f,
                "Frame buffer too small: expected at least {} bytes, got {}",
                expected, actual
            ),
            ConvertError::UnsupportedFormat(msg) => write!(f, "Unsupported pixel format: {}", msg),
            ConvertError::Encoding(msg) => write!(f, "Image encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            DecodeError::Unavailable(msg) => write!(f, "Decoder unavailable: {}", msg),
            DecodeError::UnsupportedFormat(msg) => write!(f, "Unsupported symbol format: {}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied => write!(f, "Permission denied"),
            ScanError::CameraUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            ScanError::ImageLoad(msg) => write!(f, "Failed to load image: {}", msg),
            ScanError::Decode(e) => write!(f, "Decoding failed: {}", e),
            ScanError::DecoderUnavailable(e) => {
                write!(f, "Decoder keeps failing, scanning stopped: {}", e)
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ConvertError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for ScanError {}

impl From<DecodeError> for ScanError {
    fn from(err: DecodeError) -> Self {
        ScanError::Decode(err)
    }
}

impl From<BackendError> for ScanError {
    fn from(err: BackendError) -> Self {
        ScanError::CameraUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for ConvertError {
    fn from(err: image::ImageError) -> Self {
        ConvertError::Encoding(err.to_string())
    }
}
