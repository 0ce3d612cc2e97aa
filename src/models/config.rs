use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Settings loaded from `qrlink.yaml` (and `QRLINK__*` environment overrides)
///
/// Every field has a default, so an empty or missing file yields a usable
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host tick rate used by the interval clock, in frames per second
    pub frame_rate: u32,

    /// Enables debug-level logging
    pub debug_mode: bool,

    pub capture: CaptureSettings,

    pub display: DisplaySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            debug_mode: false,
            capture: CaptureSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

/// Capture widget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Side of the square capture texture, in pixels
    pub resolution: u32,

    /// Auto-cancel after this many seconds of unscaled time. Zero or negative disables.
    pub cancel_timeout_seconds: f32,

    /// How the square preview is fit into the widget area
    pub aspect_mode: AspectMode,

    /// Use the camera flow on desktop platforms instead of the text buffer
    pub desktop_camera: bool,

    /// Host ticks to wait between widget instantiation and the first scan
    pub settle_frames: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            cancel_timeout_seconds: 0.0,
            aspect_mode: AspectMode::EnvelopeParent,
            desktop_camera: false,
            settle_frames: default_settle_frames(),
        }
    }
}

/// Display widget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub dark_color: Color,

    pub light_color: Color,

    pub error_correction: EccLevel,

    /// Pixels per QR module
    pub module_scale: u32,

    /// Light border around the symbol, in modules
    pub quiet_zone: u32,

    /// Hide the display after this many seconds. Zero or negative disables.
    pub close_timeout_seconds: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            dark_color: Color::BLACK,
            light_color: Color::WHITE,
            error_correction: EccLevel::Q,
            module_scale: default_module_scale(),
            quiet_zone: default_quiet_zone(),
            close_timeout_seconds: 0.0,
        }
    }
}

fn default_frame_rate() -> u32 {
    60
}

fn default_resolution() -> u32 {
    1000
}

fn default_settle_frames() -> u32 {
    2
}

fn default_module_scale() -> u32 {
    20
}

fn default_quiet_zone() -> u32 {
    4
}

/// QR error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EccLevel {
    L,
    M,
    #[default]
    Q,
    H,
}

/// How a square image is fit into a (possibly non-square) area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectMode {
    /// Fill the area, ignoring the aspect ratio
    None,
    WidthControlsHeight,
    HeightControlsWidth,
    /// Largest square fully inside the area
    FitInParent,
    /// Smallest square covering the whole area
    #[default]
    EnvelopeParent,
}

impl AspectMode {
    /// Size of a square image laid out in an area of `width` x `height`.
    pub fn fit(self, width: f32, height: f32) -> (f32, f32) {
        match self {
            AspectMode::None => (width, height),
            AspectMode::WidthControlsHeight => (width, width),
            AspectMode::HeightControlsWidth => (height, height),
            AspectMode::FitInParent => {
                let side = width.min(height);
                (side, side)
            }
            AspectMode::EnvelopeParent => {
                let side = width.max(height);
                (side, side)
            }
        }
    }
}

/// 8-bit RGBA color, written as `#RRGGBB` or `#RRGGBBAA`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color {0:?}, expected #RRGGBB or #RRGGBBAA")]
pub struct ColorParseError(pub String);

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}
