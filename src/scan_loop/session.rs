// SPDX-License-Identifier: GPL-3.0-only

//! Scan-retry state machine
//!
//! Pure state: the session never touches the camera, the decoder or a clock.
//! The driver feeds it conversion and decode results together with the
//! current time and acts on the returned [`FrameOutcome`].

use crate::errors::{ConvertError, DecodeError};
use crate::media::DecodableImage;
use crate::scanner::{Scan, first_success};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Converted frame as delivered by the capture callback
pub type ConvertedFrame = Result<Arc<DecodableImage>, ConvertError>;

/// Current phase of the scan loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Camera not acquired yet
    Idle,
    /// Camera running, waiting for the next frame
    Capturing,
    /// A frame is being turned into a decodable image
    Converting,
    /// An image is with the decoder
    Decoding,
    /// A code was found; capture is released until `resume_at`
    Paused { resume_at: Instant },
    /// The decoder kept failing; the loop gave up
    Failed,
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A code was decoded and should be shown
    Found(Scan),
    /// No code in this frame
    NotFound,
    /// Same text as the last notification within the repeat window
    Suppressed(Scan),
    /// Frame arrived while not capturing (or could not be converted)
    Ignored,
    /// The decoder failed on this frame
    DecoderFailed(DecodeError),
    /// The decoder failed too many times in a row
    DecoderUnavailable(DecodeError),
}

/// Tuning for the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Pause after a successful scan
    pub resume_delay: Duration,
    /// Suppress the same text seen again within `repeat_window`
    pub suppress_repeats: bool,
    pub repeat_window: Duration,
    /// Consecutive decoder failures before giving up
    pub max_decode_failures: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            resume_delay: crate::constants::RESUME_DELAY,
            suppress_repeats: false,
            repeat_window: crate::constants::REPEAT_WINDOW,
            max_decode_failures: crate::constants::MAX_DECODE_FAILURES,
        }
    }
}

/// Frame counters for a scan session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Frames accepted for processing
    pub frames: u64,
    /// Frames dropped because they arrived while not capturing
    pub ignored: u64,
    /// Frames the converter rejected
    pub conversion_failures: u64,
    /// Successful decode calls (with or without a code)
    pub decoded: u64,
    /// Codes reported to the user
    pub found: u64,
    /// Codes suppressed as repeats
    pub suppressed: u64,
    /// Failed decode calls
    pub decode_failures: u64,
}

/// The scan-retry state machine
#[derive(Debug)]
pub struct ScanSession {
    state: ScanState,
    settings: SessionSettings,
    consecutive_failures: u32,
    /// Last reported text and when it was last seen
    last_seen: Option<(String, Instant)>,
    stats: ScanStats,
}

impl ScanSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            state: ScanState::Idle,
            settings,
            consecutive_failures: 0,
            last_seen: None,
            stats: ScanStats::default(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// When a paused session may resume
    pub fn resume_at(&self) -> Option<Instant> {
        match self.state {
            ScanState::Paused { resume_at } => Some(resume_at),
            _ => None,
        }
    }

    /// Enter `Capturing` after the camera was (re)acquired
    ///
    /// A failed session stays failed.
    pub fn begin_capture(&mut self) {
        match self.state {
            ScanState::Failed => warn!("Cannot resume capture after decoder failure"),
            _ => {
                trace!(from = ?self.state, "Entering capture");
                self.state = ScanState::Capturing;
            }
        }
    }

    /// Leave `Paused` once the resume time has passed
    ///
    /// Returns true if the session is ready for capture to be re-acquired.
    pub fn resume(&mut self, now: Instant) -> bool {
        match self.state {
            ScanState::Paused { resume_at } if now >= resume_at => {
                debug!("Pause elapsed, resuming capture");
                self.state = ScanState::Idle;
                true
            }
            ScanState::Idle => true,
            _ => false,
        }
    }

    /// Accept a converted frame
    ///
    /// Returns the image to decode, or `None` if the frame must be skipped.
    /// On `Some` the session is in `Decoding` and expects [`Self::on_decoded`].
    pub fn on_frame(&mut self, frame: ConvertedFrame) -> Option<Arc<DecodableImage>> {
        if self.state != ScanState::Capturing {
            self.stats.ignored += 1;
            trace!(state = ?self.state, "Ignoring frame");
            return None;
        }

        self.state = ScanState::Converting;
        match frame {
            Ok(image) => {
                self.stats.frames += 1;
                self.state = ScanState::Decoding;
                Some(image)
            }
            Err(e) => {
                self.stats.conversion_failures += 1;
                if self.stats.conversion_failures % crate::constants::capture::LOG_EVERY_N_FRAMES
                    == 1
                {
                    warn!(error = %e, "Skipping frame that could not be converted");
                }
                self.state = ScanState::Capturing;
                None
            }
        }
    }

    /// Record the decoder's answer for the image returned by [`Self::on_frame`]
    pub fn on_decoded(
        &mut self,
        result: Result<Vec<Scan>, DecodeError>,
        now: Instant,
    ) -> FrameOutcome {
        if self.state != ScanState::Decoding {
            self.stats.ignored += 1;
            return FrameOutcome::Ignored;
        }

        let scans = match result {
            Ok(scans) => scans,
            Err(e) => return self.on_decode_error(e),
        };

        self.consecutive_failures = 0;
        self.stats.decoded += 1;

        let Some(scan) = first_success(scans) else {
            self.state = ScanState::Capturing;
            return FrameOutcome::NotFound;
        };

        if self.is_repeat(&scan, now) {
            self.last_seen = Some((scan.text.clone(), now));
            self.stats.suppressed += 1;
            self.state = ScanState::Capturing;
            debug!(text = %scan.text, "Suppressing repeated code");
            return FrameOutcome::Suppressed(scan);
        }

        self.last_seen = Some((scan.text.clone(), now));
        self.stats.found += 1;
        self.state = ScanState::Paused {
            resume_at: now + self.settings.resume_delay,
        };
        FrameOutcome::Found(scan)
    }

    fn on_decode_error(&mut self, error: DecodeError) -> FrameOutcome {
        self.consecutive_failures += 1;
        self.stats.decode_failures += 1;

        if self.consecutive_failures >= self.settings.max_decode_failures {
            self.state = ScanState::Failed;
            return FrameOutcome::DecoderUnavailable(error);
        }

        self.state = ScanState::Capturing;
        FrameOutcome::DecoderFailed(error)
    }

    fn is_repeat(&self, scan: &Scan, now: Instant) -> bool {
        if !self.settings.suppress_repeats {
            return false;
        }
        match &self.last_seen {
            Some((text, seen_at)) => {
                *text == scan.text && now.saturating_duration_since(*seen_at) < self.settings.repeat_window
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanFormat;
    use image::ImageFormat;

    fn image() -> ConvertedFrame {
        Ok(Arc::new(DecodableImage::from_parts(
            vec![1, 2, 3],
            4,
            4,
            ImageFormat::Jpeg,
        )))
    }

    fn hello() -> Vec<Scan> {
        vec![Scan::new("HELLO123", ScanFormat::QrCode)]
    }

    fn capturing(settings: SessionSettings) -> ScanSession {
        let mut session = ScanSession::new(settings);
        session.begin_capture();
        session
    }

    #[test]
    fn test_not_found_keeps_capturing() {
        let mut session = capturing(SessionSettings::default());
        assert!(session.on_frame(image()).is_some());
        assert_eq!(session.state(), ScanState::Decoding);

        let outcome = session.on_decoded(Ok(Vec::new()), Instant::now());
        assert_eq!(outcome, FrameOutcome::NotFound);
        assert_eq!(session.state(), ScanState::Capturing);
    }

    #[test]
    fn test_found_pauses_for_resume_delay() {
        let mut session = capturing(SessionSettings::default());
        let now = Instant::now();

        session.on_frame(image());
        let outcome = session.on_decoded(Ok(hello()), now);

        assert_eq!(outcome, FrameOutcome::Found(Scan::new("HELLO123", ScanFormat::QrCode)));
        assert_eq!(session.resume_at(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_frames_during_pause_are_ignored() {
        let mut session = capturing(SessionSettings::default());
        let now = Instant::now();
        session.on_frame(image());
        session.on_decoded(Ok(hello()), now);

        assert!(session.on_frame(image()).is_none());
        assert!(!session.resume(now + Duration::from_millis(1999)));
        assert!(session.on_frame(image()).is_none());
        assert_eq!(session.stats().ignored, 2);

        assert!(session.resume(now + Duration::from_secs(2)));
        session.begin_capture();
        assert!(session.on_frame(image()).is_some());
    }

    #[test]
    fn test_empty_text_is_not_a_success() {
        let mut session = capturing(SessionSettings::default());
        session.on_frame(image());
        let outcome = session.on_decoded(
            Ok(vec![Scan::new("", ScanFormat::QrCode)]),
            Instant::now(),
        );
        assert_eq!(outcome, FrameOutcome::NotFound);
    }

    #[test]
    fn test_conversion_failure_skips_frame() {
        let mut session = capturing(SessionSettings::default());
        let frame = Err(ConvertError::InvalidDimensions {
            width: 0,
            height: 0,
        });
        assert!(session.on_frame(frame).is_none());
        assert_eq!(session.state(), ScanState::Capturing);
        assert_eq!(session.stats().conversion_failures, 1);
    }

    #[test]
    fn test_repeated_decoder_errors_fail_session() {
        let settings = SessionSettings {
            max_decode_failures: 3,
            ..SessionSettings::default()
        };
        let mut session = capturing(settings);
        let error = DecodeError::Unavailable("down".into());

        for _ in 0..2 {
            session.on_frame(image());
            let outcome = session.on_decoded(Err(error.clone()), Instant::now());
            assert!(matches!(outcome, FrameOutcome::DecoderFailed(_)));
        }

        session.on_frame(image());
        let outcome = session.on_decoded(Err(error), Instant::now());
        assert!(matches!(outcome, FrameOutcome::DecoderUnavailable(_)));
        assert_eq!(session.state(), ScanState::Failed);

        session.begin_capture();
        assert_eq!(session.state(), ScanState::Failed);
    }

    #[test]
    fn test_successful_decode_resets_failure_count() {
        let settings = SessionSettings {
            max_decode_failures: 2,
            ..SessionSettings::default()
        };
        let mut session = capturing(settings);
        let error = DecodeError::Unavailable("flaky".into());

        session.on_frame(image());
        session.on_decoded(Err(error.clone()), Instant::now());
        session.on_frame(image());
        session.on_decoded(Ok(Vec::new()), Instant::now());
        session.on_frame(image());
        let outcome = session.on_decoded(Err(error), Instant::now());

        assert!(matches!(outcome, FrameOutcome::DecoderFailed(_)));
    }

    #[test]
    fn test_repeat_suppression() {
        let settings = SessionSettings {
            suppress_repeats: true,
            repeat_window: Duration::from_secs(5),
            ..SessionSettings::default()
        };
        let mut session = capturing(settings);
        let start = Instant::now();

        session.on_frame(image());
        assert!(matches!(
            session.on_decoded(Ok(hello()), start),
            FrameOutcome::Found(_)
        ));

        let resumed = start + Duration::from_secs(2);
        assert!(session.resume(resumed));
        session.begin_capture();

        session.on_frame(image());
        assert!(matches!(
            session.on_decoded(Ok(hello()), resumed),
            FrameOutcome::Suppressed(_)
        ));

        // A different code is reported right away
        session.on_frame(image());
        let other = vec![Scan::new("OTHER", ScanFormat::DataMatrix)];
        assert!(matches!(
            session.on_decoded(Ok(other), resumed),
            FrameOutcome::Found(_)
        ));
    }

    #[test]
    fn test_repeat_suppression_disabled_by_default() {
        let mut session = capturing(SessionSettings::default());
        let start = Instant::now();
        session.on_frame(image());
        session.on_decoded(Ok(hello()), start);

        let resumed = start + Duration::from_secs(2);
        session.resume(resumed);
        session.begin_capture();
        session.on_frame(image());
        assert!(matches!(
            session.on_decoded(Ok(hello()), resumed),
            FrameOutcome::Found(_)
        ));
    }
}
