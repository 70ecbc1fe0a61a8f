// SPDX-License-Identifier: GPL-3.0-only

//! Media conversion
//!
//! Turns raw camera frames into compressed images the decoders can read.

pub mod decodable_image;
pub mod frame_converter;

pub use decodable_image::DecodableImage;
pub use frame_converter::FrameConverter;
