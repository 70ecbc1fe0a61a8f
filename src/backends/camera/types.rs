// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use std::time::Instant;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// NV21 - Semi-planar 4:2:0 (Y plane + interleaved VU plane)
    /// Default analysis format on Android-style pipelines
    Nv21,
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    /// Like NV21 but with U and V swapped
    Nv12,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    Yuyv,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// All formats in order of preference for barcode scanning
    pub const ALL: [PixelFormat; 4] = [
        PixelFormat::Nv21,
        PixelFormat::Nv12,
        PixelFormat::Yuyv,
        PixelFormat::Gray8,
    ];

    /// V4L2 FourCC code for this format
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            PixelFormat::Nv21 => *b"NV21",
            PixelFormat::Nv12 => *b"NV12",
            PixelFormat::Yuyv => *b"YUYV",
            PixelFormat::Gray8 => *b"GREY",
        }
    }

    /// Parse a V4L2 FourCC code
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|f| &f.fourcc() == fourcc)
    }

    /// Default row stride (bytes) of the first plane for a given width
    pub fn default_stride(&self, width: u32) -> u32 {
        match self {
            PixelFormat::Yuyv => width * 2,
            PixelFormat::Nv21 | PixelFormat::Nv12 | PixelFormat::Gray8 => width,
        }
    }

    /// Minimum buffer length for a frame of this format
    ///
    /// For the semi-planar formats the chroma plane directly follows the luma
    /// plane and uses the same stride.
    pub fn min_buffer_len(&self, width: u32, height: u32, stride: u32) -> usize {
        let stride = stride as usize;
        let width = width as usize;
        let height = height as usize;
        if height == 0 || width == 0 {
            return 0;
        }
        match self {
            PixelFormat::Nv21 | PixelFormat::Nv12 => {
                let chroma_rows = height.div_ceil(2);
                let chroma_row_len = width.div_ceil(2) * 2;
                stride * height + stride * (chroma_rows - 1) + chroma_row_len
            }
            PixelFormat::Yuyv => stride * (height - 1) + width.div_ceil(2) * 4,
            PixelFormat::Gray8 => stride * (height - 1) + width,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fourcc = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&fourcc))
    }
}

/// One frame delivered by a camera pipeline
///
/// The pixel data is borrowed from the pipeline's buffer and is only valid
/// for the duration of the delivery callback.
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    pub width: u32,
    pub height: u32,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// Row stride of the first plane in bytes (may include padding)
    pub stride: u32,
    /// Raw pixel planes, owned by the pipeline
    pub data: &'a [u8],
    /// Driver sequence number
    pub sequence: u32,
    /// Timestamp when the frame was dequeued
    pub captured_at: Instant,
}

impl<'a> CapturedFrame<'a> {
    /// Create a frame with a tightly packed stride
    pub fn new(data: &'a [u8], width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            stride: format.default_stride(width),
            data,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    /// Human-readable name (V4L2 card)
    pub name: String,
    /// Device node, e.g. /dev/video0
    pub path: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Pixel formats this device can deliver that the converter understands
    pub formats: Vec<PixelFormat>,
}

/// Requested capture configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    /// Preferred pixel format; the backend falls back to any supported one
    pub pixel_format: PixelFormat,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            width: crate::constants::capture::DEFAULT_WIDTH,
            height: crate::constants::capture::DEFAULT_HEIGHT,
            pixel_format: PixelFormat::Nv21,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Why a capture source could not be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No capture node at the given path, or none on the system
    DeviceNotFound(String),
    /// The node exists but could not be opened or configured
    OpenFailed(String),
    /// The device offers no pixel layout the converter understands
    FormatNotSupported(String),
    Io(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "No camera: {}", msg),
            BackendError::OpenFailed(msg) => write!(f, "Cannot open camera: {}", msg),
            BackendError::FormatNotSupported(msg) => {
                write!(f, "Unsupported camera format: {}", msg)
            }
            BackendError::Io(msg) => write!(f, "Camera I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::Io(err.to_string()),
        }
    }
}
