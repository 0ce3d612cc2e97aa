// Data models module
//
// This module contains the settings structures loaded from YAML and the
// identifiers and outcomes shared by capture and display sessions.

pub mod config;
pub mod session;

pub use config::{AspectMode, CaptureSettings, Color, DisplaySettings, EccLevel, Settings};
pub use session::{SessionId, SessionKind, SessionOutcome};
