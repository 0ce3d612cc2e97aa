//! Services module - External collaborators of the capture and display sessions.
//!
//! Everything in here is **framework-agnostic**: no widget, no host loop, only
//! the narrow contracts the session controller talks to and their default
//! implementations.
//!
//! # Components
//!
//! - [`FrameSource`] / [`CameraBackend`]: live camera feed, started before the
//!   first read and stopped on teardown. [`StillImageBackend`] serves an image
//!   file as a rear camera.
//! - [`Decoder`]: `(pixels, width, height) -> text | none`. [`RqrrDecoder`]
//!   reads QR codes with `rqrr`.
//! - [`Encoder`]: `(text, style) -> bitmap`. [`QrCodeGenEncoder`] generates
//!   symbols with `qrcodegen` and rasterizes them with `image`.
//! - [`CameraAuthority`] and [`ensure_camera_access`]: the permission gate.
//! - [`TextBuffer`]: clipboard-like fallback source.
//!
//! # Usage Example
//!
//! ```ignore
//! use qrlink::services::{Decoder, Encoder, QrCodeGenEncoder, QrStyle, RqrrDecoder};
//!
//! let bitmap = QrCodeGenEncoder::new().encode("hello", &QrStyle::default())?;
//! let text = RqrrDecoder::new().decode(
//!     bitmap.image.as_raw(),
//!     bitmap.width(),
//!     bitmap.height(),
//! )?;
//! assert_eq!(text.as_deref(), Some("hello"));
//! ```

pub mod decoder;
pub mod encoder;
pub mod frame_source;
pub mod permission;
pub mod text_buffer;

pub use decoder::{DecodeError, Decoder, RqrrDecoder};
pub use encoder::{EncodeError, Encoder, QrBitmap, QrCodeGenEncoder, QrStyle};
pub use frame_source::{
    CameraBackend, CameraDevice, Frame, FrameSource, FrameSourceError, StillImageBackend,
    StillImageSource, select_rear_camera,
};
pub use permission::{CameraAuthority, GateOutcome, Platform, StaticAuthority, ensure_camera_access};
pub use text_buffer::{MemoryTextBuffer, TextBuffer};
