// SPDX-License-Identifier: GPL-3.0-only

//! Still-image replay source
//!
//! Feeds the same picture to the scan loop at a fixed rate, as if a camera
//! were pointed at it. Handy for exercising the camera path without a
//! device.

use super::capture_thread::CaptureThread;
use super::types::{BackendError, BackendResult, CapturedFrame, PixelFormat};
use super::{CaptureHandle, CaptureSource, FrameSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default replay rate
const DEFAULT_INTERVAL: Duration = Duration::from_millis(33);

/// Capture source that replays an image file as grayscale frames
pub struct ReplaySource {
    path: PathBuf,
    interval: Duration,
    /// Decoded luma plane, loaded on first start
    luma: Option<(Arc<[u8]>, u32, u32)>,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: DEFAULT_INTERVAL,
            luma: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn load(&mut self) -> BackendResult<(Arc<[u8]>, u32, u32)> {
        if let Some(loaded) = &self.luma {
            return Ok(loaded.clone());
        }
        let loaded = load_luma(&self.path)?;
        self.luma = Some(loaded.clone());
        Ok(loaded)
    }
}

/// Load an image file as a tightly packed luma plane
fn load_luma(path: &Path) -> BackendResult<(Arc<[u8]>, u32, u32)> {
    info!(path = %path.display(), "Loading replay image");

    let img = image::open(path).map_err(|e| {
        BackendError::OpenFailed(format!(
            "Failed to load image '{}': {}",
            path.display(),
            e
        ))
    })?;

    let luma = img.into_luma8();
    let (width, height) = luma.dimensions();
    info!(width, height, "Replay image loaded");
    Ok((Arc::from(luma.into_raw()), width, height))
}

impl CaptureSource for ReplaySource {
    fn describe(&self) -> String {
        format!("replay {}", self.path.display())
    }

    fn start_capture(&mut self, mut sink: FrameSink) -> BackendResult<CaptureHandle> {
        let (data, width, height) = self.load()?;
        let interval = self.interval;
        let mut sequence = 0u32;

        let thread = CaptureThread::spawn("replay-capture", move |stop| {
            loop {
                let mut frame = CapturedFrame::new(&data, width, height, PixelFormat::Gray8);
                frame.sequence = sequence;
                sequence = sequence.wrapping_add(1);
                sink.deliver(&frame);
                if !stop.sleep(interval) {
                    return Ok(());
                }
            }
        });

        Ok(CaptureHandle::from_thread(self.describe(), thread))
    }
}
