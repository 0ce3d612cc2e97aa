//! Widget contracts and scoped teardown.

use super::SessionError;
use crate::models::{CaptureSettings, DisplaySettings, SessionId};
use crate::services::{Frame, FrameSourceError, QrBitmap};
use crate::state::SessionMonitor;
use std::ops::{Deref, DerefMut};
use tokio::sync::broadcast;

/// User actions a widget reports to the session that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    CancelPressed,
    ScanPressed,
    ClosePressed,
}

/// A transient on-screen instance
pub trait Widget {
    /// Subscribe to user actions. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<WidgetEvent>;

    /// Remove the widget and release everything it holds
    fn destroy(&mut self);
}

/// Camera preview widget
pub trait CaptureSurface: Widget {
    /// Whether a camera feed was opened for this widget
    fn has_device(&self) -> bool;

    /// Latest camera frame
    fn read_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;

    /// `true` when the widget has a scan button; decoding then only happens on a press
    fn scan_on_demand(&self) -> bool;

    /// Rotate the preview, in degrees
    fn set_orientation(&mut self, degrees: i32);
}

/// QR display widget
pub trait DisplaySurface: Widget {
    /// Show `bitmap`, or clear the texture with `None`
    fn set_texture(&mut self, bitmap: Option<&QrBitmap>);

    fn show(&mut self);

    fn hide(&mut self);

    fn is_visible(&self) -> bool;
}

/// Instantiates capture widgets
pub trait CaptureFactory {
    type Surface: CaptureSurface;

    fn instantiate(&self, settings: &CaptureSettings) -> Result<Self::Surface, SessionError>;
}

/// Instantiates display widgets
pub trait DisplayFactory {
    type Surface: DisplaySurface;

    fn instantiate(&self, settings: &DisplaySettings) -> Result<Self::Surface, SessionError>;
}

/// Owns a widget for the lifetime of a session and destroys it exactly once
/// when dropped, whichever way the session ends.
pub struct WidgetGuard<'m, W: Widget> {
    widget: W,
    session: SessionId,
    monitor: &'m SessionMonitor,
}

impl<'m, W: Widget> WidgetGuard<'m, W> {
    pub fn new(widget: W, session: SessionId, monitor: &'m SessionMonitor) -> Self {
        monitor.widget_instantiated(session);
        Self {
            widget,
            session,
            monitor,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl<W: Widget> Deref for WidgetGuard<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.widget
    }
}

impl<W: Widget> DerefMut for WidgetGuard<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        &mut self.widget
    }
}

impl<W: Widget> Drop for WidgetGuard<'_, W> {
    fn drop(&mut self) {
        self.widget.destroy();
        self.monitor.widget_destroyed(self.session);
        tracing::debug!("Session {} widget destroyed", self.session);
    }
}
