// SPDX-License-Identifier: GPL-3.0-only

//! Barcode decode service abstraction
//!
//! The scan flows only talk to the [`Decoder`] trait, so the camera loop and
//! the photo path can run against the bundled [`LocalDecoder`] or a fake.

pub mod local_decoder;
pub mod types;

pub use local_decoder::LocalDecoder;
pub use types::{Scan, ScanFormat, ScanOptions};

use crate::errors::DecodeError;
use crate::media::DecodableImage;

/// A service that extracts machine-readable codes from an image
pub trait Decoder: Send + Sync {
    /// Decode all codes of the requested formats in `image`
    ///
    /// An empty vector means no code was found. Errors are reserved for the
    /// service itself failing (unreadable image, backend unavailable).
    fn decode(
        &self,
        image: &DecodableImage,
        options: &ScanOptions,
    ) -> Result<Vec<Scan>, DecodeError>;
}

/// First scan that counts as a successful decode (non-empty text)
pub fn first_success(scans: Vec<Scan>) -> Option<Scan> {
    scans.into_iter().find(|scan| !scan.text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_success_skips_empty_text() {
        let scans = vec![
            Scan::new("", ScanFormat::QrCode),
            Scan::new("HELLO", ScanFormat::DataMatrix),
        ];
        let scan = first_success(scans).unwrap();
        assert_eq!(scan.text, "HELLO");
        assert_eq!(scan.format, ScanFormat::DataMatrix);
    }

    #[test]
    fn test_first_success_none_for_empty_results() {
        assert!(first_success(Vec::new()).is_none());
        assert!(first_success(vec![Scan::new("", ScanFormat::QrCode)]).is_none());
    }
}
