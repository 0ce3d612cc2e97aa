//! Session module - the capture and display state machines.
//!
//! Both flows share one shape:
//!
//! 1. prerequisite check (camera permission for capture, nothing for display)
//! 2. widget instantiation through a factory, wrapped in a [`WidgetGuard`]
//! 3. a cooperative [`poll_until`] loop that yields to the host frame clock
//! 4. teardown, which the guard performs exactly once on every exit path
//!
//! Nothing here blocks: every wait is "suspend until the next host frame,
//! then re-check". Cancellation is a flag observed once per frame.

pub mod capture;
pub mod display;
pub mod poll;
pub mod widget;

use thiserror::Error;

pub use capture::{CaptureSession, run_capture_session};
pub use display::{DisplaySession, run_display_session};
pub use poll::{Deadline, PollOutcome, PollStep, poll_until};
pub use widget::{
    CaptureFactory, CaptureSurface, DisplayFactory, DisplaySurface, Widget, WidgetEvent,
    WidgetGuard,
};

/// Errors surfaced by capture and display sessions
///
/// Transient decode failures never show up here; they are swallowed inside
/// the poll loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Camera authorization missing after one request prompt
    #[error("camera permission denied")]
    PermissionDenied,

    /// The platform has no camera; callers fall back to the text buffer
    #[error("no camera device available")]
    NoDeviceAvailable,

    /// A widget was set up wrong (missing or mis-parented child)
    #[error("invalid widget configuration: {0}")]
    Configuration(String),
}
