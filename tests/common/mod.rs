// SPDX-License-Identifier: GPL-3.0-only

//! Shared fixtures for integration tests

#![allow(dead_code)]

use image::{GrayImage, Luma};
use qrcode::{Color, QrCode};

/// Pixels per QR module
const MODULE_SIZE: u32 = 6;
/// Quiet zone around the symbol, in modules
const QUIET_ZONE: u32 = 4;

/// Render `payload` as a black-on-white QR code
pub fn qr_luma(payload: &str) -> GrayImage {
    let code = QrCode::new(payload.as_bytes()).expect("payload fits in a QR code");
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let side = (modules + 2 * QUIET_ZONE) * MODULE_SIZE;
    GrayImage::from_fn(side, side, |x, y| {
        let mx = (x / MODULE_SIZE) as i64 - QUIET_ZONE as i64;
        let my = (y / MODULE_SIZE) as i64 - QUIET_ZONE as i64;
        let inside = (0..modules as i64).contains(&mx) && (0..modules as i64).contains(&my);
        if inside && colors[(my as usize) * modules as usize + mx as usize] == Color::Dark {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Pack a grayscale image into an NV21 buffer with neutral chroma
///
/// Odd dimensions are padded with white to the next even size.
pub fn luma_to_nv21(luma: &GrayImage) -> (Vec<u8>, u32, u32) {
    let width = luma.width().next_multiple_of(2);
    let height = luma.height().next_multiple_of(2);

    let mut data = vec![255u8; (width * height) as usize];
    for (x, y, pixel) in luma.enumerate_pixels() {
        data[(y * width + x) as usize] = pixel[0];
    }
    data.extend(std::iter::repeat_n(128u8, (width * height / 2) as usize));
    (data, width, height)
}

/// NV21 frame buffer showing a QR code for `payload`
pub fn qr_nv21(payload: &str) -> (Vec<u8>, u32, u32) {
    luma_to_nv21(&qr_luma(payload))
}

/// Blank NV21 frame with no code in it
pub fn blank_nv21(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![200u8; (width * height) as usize];
    data.extend(std::iter::repeat_n(128u8, (width * height / 2) as usize));
    data
}
