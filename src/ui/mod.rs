// UI module - host-facing side of the sessions
//
// This module contains:
// - FrameClock: the host frame cadence every session loop waits on
// - SessionController: capture/display entry points with external cancellation
// - CameraSurface / TerminalDisplay: default widgets and their factories

pub mod bridge;
pub mod controller;
pub mod surfaces;
pub mod terminal;

pub use bridge::{FixedStepClock, FrameClock, IntervalClock, frame_period};
pub use controller::{CancelHandle, SessionController};
pub use surfaces::{
    CameraSurface, CameraSurfaceFactory, CaptureLayout, DisplayLayout, Placement, WidgetButtons,
    display_size,
};
pub use terminal::{QrView, ScreenMode, TerminalDisplay, TerminalDisplayFactory, key_action};
