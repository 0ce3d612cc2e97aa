//! QR bitmap generation.
//!
//! The [`Encoder`] contract turns text plus a [`QrStyle`] into a [`QrBitmap`]:
//! the module matrix and an RGBA image where every module is
//! `module_scale` pixels wide, surrounded by a light quiet zone.

use crate::models::{Color, DisplaySettings, EccLevel};
use image::{Rgba, RgbaImage};
use qrcodegen::{QrCode, QrCodeEcc, QrSegment, Version};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("text does not fit in a QR symbol: {0}")]
    DataTooLong(String),

    #[error("module scale must be at least 1")]
    InvalidScale,

    #[error("bitmap side of {modules} modules at scale {scale} exceeds {MAX_BITMAP_SIDE} pixels")]
    TooLarge { modules: u64, scale: u32 },
}

/// Largest bitmap side, in pixels, the encoder will allocate
pub const MAX_BITMAP_SIDE: u32 = 16_384;

/// Pixel side of a `size`-module symbol with `quiet_zone` on each side
fn bitmap_side(size: u32, quiet_zone: u32, scale: u32) -> Result<u32, EncodeError> {
    let modules = u64::from(size) + 2 * u64::from(quiet_zone);
    modules
        .checked_mul(u64::from(scale))
        .filter(|side| *side <= u64::from(MAX_BITMAP_SIDE))
        .map(|side| side as u32)
        .ok_or(EncodeError::TooLarge { modules, scale })
}

/// Rendering parameters for a QR bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrStyle {
    pub error_correction: EccLevel,
    pub dark: Color,
    pub light: Color,
    pub module_scale: u32,
    pub quiet_zone: u32,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self::from(&DisplaySettings::default())
    }
}

impl From<&DisplaySettings> for QrStyle {
    fn from(settings: &DisplaySettings) -> Self {
        Self {
            error_correction: settings.error_correction,
            dark: settings.dark_color,
            light: settings.light_color,
            module_scale: settings.module_scale,
            quiet_zone: settings.quiet_zone,
        }
    }
}

/// A rendered QR symbol
#[derive(Debug, Clone, PartialEq)]
pub struct QrBitmap {
    /// Modules per side, without the quiet zone
    pub size: u32,
    /// Row-major module matrix, `true` is dark
    pub modules: Vec<bool>,
    pub image: RgbaImage,
    pub error_correction: EccLevel,
}

impl QrBitmap {
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size && self.modules[(y * self.size + x) as usize]
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Generates QR bitmaps from text
#[cfg_attr(test, mockall::automock)]
pub trait Encoder {
    fn encode(&self, text: &str, style: &QrStyle) -> Result<QrBitmap, EncodeError>;
}

/// Encoder backed by `qrcodegen`
#[derive(Debug, Default, Clone, Copy)]
pub struct QrCodeGenEncoder;

impl QrCodeGenEncoder {
    pub fn new() -> Self {
        Self
    }
}

fn ecc(level: EccLevel) -> QrCodeEcc {
    match level {
        EccLevel::L => QrCodeEcc::Low,
        EccLevel::M => QrCodeEcc::Medium,
        EccLevel::Q => QrCodeEcc::Quartile,
        EccLevel::H => QrCodeEcc::High,
    }
}

impl Encoder for QrCodeGenEncoder {
    fn encode(&self, text: &str, style: &QrStyle) -> Result<QrBitmap, EncodeError> {
        if style.module_scale == 0 {
            return Err(EncodeError::InvalidScale);
        }

        // No ECC boosting: the symbol carries exactly the configured level
        let segments = QrSegment::make_segments(text);
        let qr = QrCode::encode_segments_advanced(
            &segments,
            ecc(style.error_correction),
            Version::MIN,
            Version::MAX,
            None,
            false,
        )
        .map_err(|e| EncodeError::DataTooLong(e.to_string()))?;

        let size = qr.size() as u32;
        let modules: Vec<bool> = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .map(|(x, y)| qr.get_module(x as i32, y as i32))
            .collect();

        let scale = style.module_scale;
        let side = bitmap_side(size, style.quiet_zone, scale)?;
        let dark = Rgba(style.dark.to_rgba());
        let light = Rgba(style.light.to_rgba());
        let image = RgbaImage::from_fn(side, side, |px, py| {
            // get_module is false outside the symbol, so the quiet zone stays light
            let mx = (px / scale) as i32 - style.quiet_zone as i32;
            let my = (py / scale) as i32 - style.quiet_zone as i32;
            if qr.get_module(mx, my) { dark } else { light }
        });

        tracing::trace!("Encoded {} bytes into a {}x{} QR symbol", text.len(), size, size);

        Ok(QrBitmap {
            size,
            modules,
            image,
            error_correction: style.error_correction,
        })
    }
}
