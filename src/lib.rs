// qrlink - QR capture and display sessions for host-driven UIs
//
// This is the library crate containing the session state machine and its
// collaborators. The binary crate (main.rs) provides a terminal demo.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{CaptureSettings, DisplaySettings, Settings};
pub use session::SessionError;
pub use state::{SessionEvent, SessionMonitor};
pub use ui::{CancelHandle, SessionController};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
