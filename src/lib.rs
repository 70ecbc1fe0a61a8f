// SPDX-License-Identifier: GPL-3.0-only

//! qrscan - QR and DataMatrix scanning from photos and live cameras
//!
//! This library provides the core functionality for the `qrscan` binary:
//! camera capture, frame conversion, barcode decoding and the scan loop that
//! ties them together.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera capture and permission checks
//! - [`media`]: Conversion of captured frames into decodable images
//! - [`scanner`]: Decoder abstraction and the in-process decoder
//! - [`scan_loop`]: Continuous camera scanning with pause and resume
//! - [`gallery`]: One-shot scanning of a picked photo
//! - [`notify`]: Where scan results and messages are shown
//! - [`config`]: User configuration handling
//! - [`storage`]: Snapshots of scanned frames
//!
//! # Example
//!
//! ```ignore
//! let (_tx, shutdown) = tokio::sync::watch::channel(false);
//! let summary = ScanLoop::new(
//!     Arc::new(LocalDecoder::new()),
//!     V4l2Source::first_available(CaptureFormat::default())?,
//!     TerminalNotifier,
//!     DevicePermissions::new(None, None),
//!     LoopSettings::default(),
//! )
//! .run(shutdown)
//! .await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gallery;
pub mod media;
pub mod notify;
pub mod scan_loop;
pub mod scanner;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, ConvertError, DecodeError, ScanError};
pub use gallery::PhotoOutcome;
pub use media::{DecodableImage, FrameConverter};
pub use scan_loop::{LoopSettings, ScanLoop, ScanSummary};
pub use scanner::{Decoder, LocalDecoder, Scan, ScanFormat, ScanOptions};
