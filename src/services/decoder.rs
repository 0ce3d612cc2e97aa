//! Barcode decoding.
//!
//! The [`Decoder`] contract is a pure function from an RGBA8 pixel buffer to
//! the decoded text, if any. Errors mean the frame could not be read and are
//! expected to happen on many frames of a live feed.

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for the given size")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("symbol found but unreadable: {0}")]
    Unreadable(String),
}

/// Reads barcode text from a frame
pub trait Decoder {
    /// Decode `pixels` (RGBA8, `width * height * 4` bytes).
    ///
    /// Returns `Ok(None)` when no symbol is present.
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Result<Option<String>, DecodeError>;
}

/// QR decoder backed by `rqrr`
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RqrrDecoder {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Result<Option<String>, DecodeError> {
        let expected = width as usize * height as usize * 4;
        let rgba = RgbaImage::from_raw(width, height, pixels.to_vec()).ok_or(
            DecodeError::InvalidBuffer {
                expected,
                actual: pixels.len(),
            },
        )?;
        let luma = DynamicImage::ImageRgba8(rgba).to_luma8();

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| luma.get_pixel(x as u32, y as u32).0[0],
        );

        let mut last_error = None;
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => return Ok(Some(content)),
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        match last_error {
            Some(reason) => Err(DecodeError::Unreadable(reason)),
            None => Ok(None),
        }
    }
}
