// SPDX-License-Identifier: GPL-3.0-only

//! Scan result and option types

use serde::{Deserialize, Serialize};

/// Symbol formats the scanner recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanFormat {
    /// QR code
    QrCode,
    /// DataMatrix (ECC200)
    DataMatrix,
}

impl ScanFormat {
    /// All supported formats
    pub const ALL: [ScanFormat; 2] = [ScanFormat::QrCode, ScanFormat::DataMatrix];

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            ScanFormat::QrCode => "QR Code",
            ScanFormat::DataMatrix => "DataMatrix",
        }
    }
}

impl std::fmt::Display for ScanFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A decoded code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Original text payload
    pub text: String,
    /// Format the payload was decoded from
    pub format: ScanFormat,
}

impl Scan {
    pub fn new(text: impl Into<String>, format: ScanFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

/// Options passed to every decode call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Formats to look for
    pub formats: Vec<ScanFormat>,
    /// Single still image rather than a video frame; decoders may spend
    /// more effort
    pub photo_mode: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            formats: ScanFormat::ALL.to_vec(),
            photo_mode: true,
        }
    }
}

impl ScanOptions {
    pub fn new(formats: impl IntoIterator<Item = ScanFormat>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_photo_mode(mut self, photo_mode: bool) -> Self {
        self.photo_mode = photo_mode;
        self
    }

    pub fn wants(&self, format: ScanFormat) -> bool {
        self.formats.contains(&format)
    }
}
