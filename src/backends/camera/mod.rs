// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │      ScanLoop       │
//! └──────────┬──────────┘
//!            │ start_capture(FrameSink) -> CaptureHandle
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureSource Trait │  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐   ┌────────┐
//!   │ V4L2 │   │ Replay │
//!   └──────┘   └────────┘
//! ```
//!
//! A source delivers frames one at a time to its [`FrameSink`] on the
//! capture thread. The frame borrows the source's buffer and is only valid
//! inside the callback.

pub mod capture_thread;
pub mod replay;
pub mod types;
pub mod v4l2;

pub use capture_thread::{CaptureThread, StopSignal};
pub use replay::ReplaySource;
pub use types::*;
pub use v4l2::{V4l2Source, list_devices};

use tracing::info;

/// A camera pipeline that can be started and stopped repeatedly
pub trait CaptureSource: Send {
    /// Human-readable description for logs and messages
    fn describe(&self) -> String;

    /// Acquire the camera and start delivering frames to `sink`
    ///
    /// Frames are delivered from a capture thread until the returned handle
    /// is stopped or dropped.
    fn start_capture(&mut self, sink: FrameSink) -> BackendResult<CaptureHandle>;
}

/// Callback receiving captured frames
pub struct FrameSink {
    deliver: Box<dyn FnMut(&CapturedFrame<'_>) + Send>,
}

impl FrameSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: FnMut(&CapturedFrame<'_>) + Send + 'static,
    {
        Self {
            deliver: Box::new(deliver),
        }
    }

    /// Hand one frame to the analyzer
    pub fn deliver(&mut self, frame: &CapturedFrame<'_>) {
        (self.deliver)(frame)
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FrameSink")
    }
}

/// Binding between a running capture and its analyzer
///
/// Stopping or dropping the handle detaches the analyzer and releases the
/// camera.
pub struct CaptureHandle {
    name: String,
    on_stop: Option<Box<dyn FnOnce() + Send>>,
}

impl CaptureHandle {
    pub fn new<F>(name: impl Into<String>, on_stop: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            on_stop: Some(Box::new(on_stop)),
        }
    }

    /// Wrap a capture thread; stopping the handle stops and joins the thread
    pub fn from_thread(name: impl Into<String>, mut thread: CaptureThread) -> Self {
        Self::new(name, move || thread.stop())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Detach the analyzer and release the camera
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(on_stop) = self.on_stop.take() {
            info!(name = %self.name, "Releasing capture");
            on_stop();
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("name", &self.name)
            .field("active", &self.on_stop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_handle_releases_once() {
        let stops = Arc::new(AtomicU32::new(0));
        let stops_clone = Arc::clone(&stops);
        let handle = CaptureHandle::new("test", move || {
            stops_clone.fetch_add(1, Ordering::SeqCst);
        });
        handle.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_releases_on_drop() {
        let stops = Arc::new(AtomicU32::new(0));
        let stops_clone = Arc::clone(&stops);
        {
            let _handle = CaptureHandle::new("test", move || {
                stops_clone.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sink_forwards_frames() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        let mut sink = FrameSink::new(move |frame| {
            seen_clone.store(frame.width, Ordering::SeqCst);
        });
        let data = [0u8; 6];
        sink.deliver(&CapturedFrame::new(&data, 3, 2, PixelFormat::Gray8));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
