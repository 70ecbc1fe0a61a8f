// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera capture
//!
//! Opens a video capture node with the v4l crate, negotiates one of the YUV
//! layouts the frame converter understands and pumps memory-mapped buffers
//! into a [`FrameSink`] on a dedicated thread.

use super::capture_thread::{CaptureThread, StopSignal};
use super::types::*;
use super::{CaptureHandle, CaptureSource, FrameSink};
use crate::constants::capture::{
    BUFFER_COUNT, LOG_EVERY_N_FRAMES, MAX_DEQUEUE_FAILURES, RETRY_BACKOFF,
};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Negotiated stream parameters
#[derive(Debug, Clone, Copy)]
struct StreamFormat {
    width: u32,
    height: u32,
    stride: u32,
    pixel_format: PixelFormat,
}

/// Camera source backed by a V4L2 capture node
pub struct V4l2Source {
    device_path: String,
    format: CaptureFormat,
}

impl V4l2Source {
    /// Create a source for a specific device node
    pub fn new(device_path: impl Into<String>, format: CaptureFormat) -> Self {
        Self {
            device_path: device_path.into(),
            format,
        }
    }

    /// Create a source for the first capture device on the system
    pub fn first_available(format: CaptureFormat) -> BackendResult<Self> {
        let device = list_devices()
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::DeviceNotFound("no V4L2 capture devices".into()))?;
        info!(name = %device.name, path = %device.path, "Using first capture device");
        Ok(Self::new(device.path, format))
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl CaptureSource for V4l2Source {
    fn describe(&self) -> String {
        format!("V4L2 {}", self.device_path)
    }

    fn start_capture(&mut self, sink: FrameSink) -> BackendResult<CaptureHandle> {
        // Open and negotiate on the caller's thread so acquisition errors
        // are reported to the scan loop instead of dying on the capture thread
        let dev = Device::with_path(&self.device_path).map_err(|e| {
            BackendError::OpenFailed(format!(
                "Failed to open V4L2 device {}: {}",
                self.device_path, e
            ))
        })?;
        let stream_format = negotiate(&dev, &self.format)?;

        info!(
            device_path = %self.device_path,
            width = stream_format.width,
            height = stream_format.height,
            stride = stream_format.stride,
            format = %stream_format.pixel_format,
            "Starting V4L2 capture"
        );

        let thread = CaptureThread::spawn("v4l2-capture", move |stop| {
            capture_loop(dev, stream_format, sink, stop)
        });

        Ok(CaptureHandle::from_thread(self.describe(), thread))
    }
}

/// Pick a pixel format and apply the requested resolution
fn negotiate(dev: &Device, requested: &CaptureFormat) -> BackendResult<StreamFormat> {
    let supported: Vec<PixelFormat> = dev
        .enum_formats()
        .map_err(|e| BackendError::OpenFailed(format!("Failed to list formats: {}", e)))?
        .iter()
        .filter_map(|desc| PixelFormat::from_fourcc(&desc.fourcc.repr))
        .collect();

    let pixel_format = if supported.contains(&requested.pixel_format) {
        requested.pixel_format
    } else {
        PixelFormat::ALL
            .into_iter()
            .find(|f| supported.contains(f))
            .ok_or_else(|| {
                BackendError::FormatNotSupported(
                    "device offers none of NV21, NV12, YUYV, GREY".into(),
                )
            })?
    };

    let mut format = dev
        .format()
        .map_err(|e| BackendError::OpenFailed(format!("Failed to query format: {}", e)))?;
    format.width = requested.width;
    format.height = requested.height;
    format.fourcc = v4l::FourCC::new(&pixel_format.fourcc());

    let applied = dev
        .set_format(&format)
        .map_err(|e| BackendError::OpenFailed(format!("Failed to set format: {}", e)))?;

    let pixel_format = PixelFormat::from_fourcc(&applied.fourcc.repr).ok_or_else(|| {
        BackendError::FormatNotSupported(format!("driver switched to {}", applied.fourcc))
    })?;

    if applied.width != requested.width || applied.height != requested.height {
        debug!(
            requested_width = requested.width,
            requested_height = requested.height,
            width = applied.width,
            height = applied.height,
            "Driver adjusted capture resolution"
        );
    }

    let stride = if applied.stride > 0 {
        applied.stride
    } else {
        pixel_format.default_stride(applied.width)
    };

    Ok(StreamFormat {
        width: applied.width,
        height: applied.height,
        stride,
        pixel_format,
    })
}

/// Capture loop running on the capture thread
fn capture_loop(
    mut dev: Device,
    format: StreamFormat,
    mut sink: FrameSink,
    stop: &StopSignal,
) -> Result<(), String> {
    let mut stream = MmapStream::with_buffers(&mut dev, Type::VideoCapture, BUFFER_COUNT)
        .map_err(|e| format!("Failed to create buffer stream: {}", e))?;

    debug!("V4L2 capture stream started");
    let mut frame_num: u64 = 0;
    let mut failures = DequeueFailures::new(MAX_DEQUEUE_FAILURES);

    while !stop.is_stopped() {
        match stream.next() {
            Ok((buf, meta)) => {
                failures.reset();
                frame_num += 1;
                let used = match meta.bytesused as usize {
                    0 => buf.len(),
                    n => n.min(buf.len()),
                };

                let frame = CapturedFrame {
                    width: format.width,
                    height: format.height,
                    format: format.pixel_format,
                    stride: format.stride,
                    data: &buf[..used],
                    sequence: meta.sequence,
                    captured_at: Instant::now(),
                };
                sink.deliver(&frame);

                if frame_num % LOG_EVERY_N_FRAMES == 0 {
                    debug!(
                        frame = frame_num,
                        sequence = meta.sequence,
                        size = used,
                        "Frame captured"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to capture frame");
                if failures.record(&e) {
                    // Dropping the sink tells the consumer no more frames will come
                    return Err(format!("Camera stopped responding: {}", e));
                }
                stop.sleep(RETRY_BACKOFF);
            }
        }
    }

    info!(frames = frame_num, "V4L2 capture loop ended");
    Ok(())
}

/// Tracks failed dequeues in a row
#[derive(Debug)]
struct DequeueFailures {
    count: u32,
    limit: u32,
}

impl DequeueFailures {
    fn new(limit: u32) -> Self {
        Self { count: 0, limit }
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    /// Count a failure; true once the device should be given up on
    fn record(&mut self, error: &std::io::Error) -> bool {
        self.count += 1;
        let gone = matches!(error.raw_os_error(), Some(libc::ENODEV) | Some(libc::ENXIO));
        gone || self.count >= self.limit
    }
}

/// Enumerate V4L2 capture devices that deliver a supported pixel format
pub fn list_devices() -> Vec<CameraDevice> {
    let mut devices: Vec<CameraDevice> = v4l::context::enum_devices()
        .into_iter()
        .filter_map(|node| probe_device(node.path()))
        .collect();
    devices.sort_by(|a, b| a.path.cmp(&b.path));
    devices
}

fn probe_device(path: &Path) -> Option<CameraDevice> {
    let dev = match Device::with_path(path) {
        Ok(dev) => dev,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping unreadable device");
            return None;
        }
    };

    let caps = dev.query_caps().ok()?;
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return None;
    }

    let formats: Vec<PixelFormat> = dev
        .enum_formats()
        .ok()?
        .iter()
        .filter_map(|desc| PixelFormat::from_fourcc(&desc.fourcc.repr))
        .collect();
    if formats.is_empty() {
        debug!(path = %path.display(), "Device has no supported pixel formats");
        return None;
    }

    Some(CameraDevice {
        name: caps.card,
        path: path.display().to_string(),
        driver: caps.driver,
        formats,
    })
}
