// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application name, used for the config directory
pub const APP_NAME: &str = "qrscan";

/// JPEG quality used when compressing captured frames (maximum)
pub const JPEG_QUALITY: u8 = 100;

/// Pause after a successful camera scan before capture is resumed
pub const RESUME_DELAY: Duration = Duration::from_secs(2);

/// Window in which a repeated identical scan is suppressed (when enabled)
pub const REPEAT_WINDOW: Duration = Duration::from_secs(5);

/// Consecutive decoder failures tolerated before the camera loop gives up
pub const MAX_DECODE_FAILURES: u32 = 30;

/// Capture timing and sizing defaults
pub mod capture {
    use super::Duration;

    /// Default capture width requested from the camera
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Default capture height requested from the camera
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Number of memory-mapped buffers for the V4L2 stream
    pub const BUFFER_COUNT: u32 = 4;

    /// Back-off after a failed buffer dequeue
    pub const RETRY_BACKOFF: Duration = Duration::from_millis(10);

    /// Consecutive failed dequeues after which the device is considered gone
    pub const MAX_DEQUEUE_FAILURES: u32 = 50;

    /// Larger side video frames are downscaled to before decoding
    pub const MAX_DECODE_DIMENSION: u32 = 1280;

    /// Log every Nth frame at debug level
    pub const LOG_EVERY_N_FRAMES: u64 = 30;
}

/// Supported file formats for the photo path
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
