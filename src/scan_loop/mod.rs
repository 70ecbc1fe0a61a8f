// SPDX-License-Identifier: GPL-3.0-only

//! Camera scan loop
//!
//! Drives capture, conversion and decoding until a code is found, shows it,
//! releases the camera for the resume delay and then starts over. Runs until
//! the shutdown signal fires or an unrecoverable error occurs.
//!
//! Frames are converted inside the capture callback, where the borrowed
//! buffer is still valid, and handed over through a `watch` channel that
//! only keeps the newest image. Decoding runs on a blocking task; the pause
//! after a hit is a tokio timer, so no thread sleeps while paused.

pub mod session;

pub use session::{
    ConvertedFrame, FrameOutcome, ScanSession, ScanState, ScanStats, SessionSettings,
};

use crate::backends::camera::{CaptureHandle, CaptureSource, CapturedFrame, FrameSink};
use crate::backends::permissions::{Permission, PermissionAuthority, PermissionStatus};
use crate::config::Config;
use crate::constants::capture::LOG_EVERY_N_FRAMES;
use crate::errors::{DecodeError, ScanError};
use crate::media::{DecodableImage, FrameConverter};
use crate::notify::Notifier;
use crate::scanner::{Decoder, Scan, ScanOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Settings for a camera scan loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub session: SessionSettings,
    pub options: ScanOptions,
    pub jpeg_quality: u8,
    /// Save the image of every reported code here
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session: SessionSettings {
                resume_delay: config.resume_delay(),
                suppress_repeats: config.suppress_repeats,
                repeat_window: config.repeat_window(),
                max_decode_failures: config.max_decode_failures,
            },
            options: ScanOptions::new(config.formats.iter().copied()).with_photo_mode(false),
            jpeg_quality: config.jpeg_quality,
            snapshot_dir: config.snapshot_dir.clone(),
        }
    }
}

/// Result of a scan loop that was shut down cleanly
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Every code reported to the user, in order
    pub scans: Vec<Scan>,
    pub stats: ScanStats,
}

/// The camera scan loop and its collaborators
pub struct ScanLoop<D, S, N, P> {
    decoder: Arc<D>,
    source: S,
    notifier: N,
    permissions: P,
    settings: LoopSettings,
}

impl<D, S, N, P> ScanLoop<D, S, N, P>
where
    D: Decoder + 'static,
    S: CaptureSource,
    N: Notifier,
    P: PermissionAuthority,
{
    pub fn new(
        decoder: Arc<D>,
        source: S,
        notifier: N,
        permissions: P,
        settings: LoopSettings,
    ) -> Self {
        Self {
            decoder,
            source,
            notifier,
            permissions,
            settings,
        }
    }

    /// Run until `shutdown` becomes true (or its sender is dropped)
    ///
    /// Never starts capture without camera permission. Camera acquisition
    /// failures and a persistently failing decoder end the loop with an
    /// error; everything else is retried.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<ScanSummary, ScanError> {
        if self.permissions.check(Permission::Camera) != PermissionStatus::Granted {
            warn!(source = %self.source.describe(), "Camera permission denied");
            self.notifier
                .show_message("Camera access is required to scan codes");
            return Err(ScanError::PermissionDenied);
        }

        let mut session = ScanSession::new(self.settings.session.clone());
        let mut summary = ScanSummary::default();

        loop {
            let (frame_tx, mut frame_rx) = watch::channel::<Option<ConvertedFrame>>(None);
            let handle = self.acquire(frame_tx)?;
            session.begin_capture();
            info!(source = %handle.name(), "Scanning");

            let (scan, image) = loop {
                tokio::select! {
                    changed = frame_rx.changed() => {
                        if changed.is_err() {
                            release(handle).await;
                            let message = format!("{} stopped delivering frames", self.source.describe());
                            error!("{}", message);
                            self.notifier.show_message(&message);
                            return Err(ScanError::CameraUnavailable(message));
                        }

                        let latest = frame_rx.borrow_and_update().clone();
                        let Some(frame) = latest else {
                            continue;
                        };
                        let Some(image) = session.on_frame(frame) else {
                            continue;
                        };

                        let result = decode(
                            Arc::clone(&self.decoder),
                            self.settings.options.clone(),
                            Arc::clone(&image),
                        )
                        .await;

                        match session.on_decoded(result, Instant::now()) {
                            FrameOutcome::Found(scan) => break (scan, image),
                            FrameOutcome::NotFound => trace!("Continue searching"),
                            FrameOutcome::Suppressed(scan) => {
                                debug!(text = %scan.text, "Code still in view")
                            }
                            FrameOutcome::Ignored => {}
                            FrameOutcome::DecoderFailed(e) => {
                                warn!(error = %e, "Decoder failed on frame")
                            }
                            FrameOutcome::DecoderUnavailable(e) => {
                                release(handle).await;
                                error!(error = %e, "Decoder keeps failing, stopping scan");
                                let err = ScanError::DecoderUnavailable(e);
                                self.notifier.show_message(&err.to_string());
                                summary.stats = session.stats();
                                return Err(err);
                            }
                        }
                    }
                    _ = shutdown_requested(&mut shutdown) => {
                        release(handle).await;
                        info!("Scan loop shut down");
                        summary.stats = session.stats();
                        return Ok(summary);
                    }
                }
            };

            self.notifier.show_scan(&scan);
            summary.scans.push(scan);

            // Detach the analyzer so the still-visible code is not decoded again
            release(handle).await;

            if let Some(dir) = self.settings.snapshot_dir.clone() {
                if let Err(e) = crate::storage::save_snapshot(&image, dir).await {
                    warn!(error = %e, "Failed to save snapshot");
                }
            }
            drop(image);

            let resume_at = session.resume_at().unwrap_or_else(Instant::now);
            debug!(
                delay_ms = self.settings.session.resume_delay.as_millis(),
                "Pausing before next scan"
            );
            tokio::select! {
                _ = tokio::time::sleep_until(resume_at) => {}
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Scan loop shut down during pause");
                    summary.stats = session.stats();
                    return Ok(summary);
                }
            }
            session.resume(Instant::now());
        }
    }

    /// Start the capture source with a converting frame sink
    fn acquire(
        &mut self,
        frame_tx: watch::Sender<Option<ConvertedFrame>>,
    ) -> Result<CaptureHandle, ScanError> {
        let sink = frame_sink(FrameConverter::with_quality(self.settings.jpeg_quality), frame_tx);
        self.source.start_capture(sink).map_err(|e| {
            error!(source = %self.source.describe(), error = %e, "Failed to acquire camera");
            self.notifier
                .show_message(&format!("Camera unavailable: {}", e));
            ScanError::from(e)
        })
    }
}

/// Build the analyzer callback: convert every frame and publish the newest
fn frame_sink(converter: FrameConverter, frame_tx: watch::Sender<Option<ConvertedFrame>>) -> FrameSink {
    let mut frame_count: u64 = 0;
    FrameSink::new(move |frame: &CapturedFrame<'_>| {
        frame_count += 1;
        let converted = converter.convert(frame).map(Arc::new);
        if frame_count % LOG_EVERY_N_FRAMES == 0 {
            debug!(
                frame = frame_count,
                sequence = frame.sequence,
                latency_us = frame.captured_at.elapsed().as_micros(),
                "Analyzed frame"
            );
        }
        frame_tx.send_replace(Some(converted));
    })
}

/// Run the decoder on a blocking task
async fn decode<D: Decoder + 'static>(
    decoder: Arc<D>,
    options: ScanOptions,
    image: Arc<DecodableImage>,
) -> Result<Vec<Scan>, DecodeError> {
    tokio::task::spawn_blocking(move || decoder.decode(&image, &options))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Decode task panicked");
            Err(DecodeError::Unavailable(format!("decode task failed: {}", e)))
        })
}

/// Stop a capture without blocking the runtime while its thread joins
async fn release(handle: CaptureHandle) {
    if let Err(e) = tokio::task::spawn_blocking(move || handle.stop()).await {
        warn!(error = %e, "Capture release task failed");
    }
}

/// Resolve once shutdown is requested or its sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
