//! Display session: render text as a QR bitmap and wait while it is shown.

use super::poll::{Deadline, PollOutcome, PollStep, poll_until};
use super::widget::{DisplayFactory, DisplaySurface, Widget, WidgetEvent, WidgetGuard};
use super::SessionError;
use crate::models::{DisplaySettings, SessionId, SessionKind, SessionOutcome};
use crate::services::{Encoder, QrBitmap, QrStyle};
use crate::state::SessionMonitor;
use crate::ui::bridge::FrameClock;
use tokio::sync::broadcast::error::TryRecvError;

/// Text shown by a display widget and the bitmap generated for it
///
/// The bitmap is regenerated, and the previous one released, whenever the
/// text changes. Empty text means no bitmap.
#[derive(Debug)]
pub struct DisplaySession {
    id: SessionId,
    text: String,
    bitmap: Option<QrBitmap>,
    style: QrStyle,
}

impl DisplaySession {
    pub fn new(id: SessionId, style: QrStyle) -> Self {
        Self {
            id,
            text: String::new(),
            bitmap: None,
            style,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bitmap(&self) -> Option<&QrBitmap> {
        self.bitmap.as_ref()
    }

    pub fn style(&self) -> &QrStyle {
        &self.style
    }

    /// Replace the displayed text. `None` is treated as empty.
    ///
    /// Returns `false` when the text is unchanged, in which case nothing is
    /// regenerated.
    pub fn set_text<S: DisplaySurface>(
        &mut self,
        text: Option<&str>,
        encoder: &dyn Encoder,
        surface: &mut S,
        monitor: &SessionMonitor,
    ) -> bool {
        let text = text.unwrap_or_default();
        if self.text == text {
            return false;
        }

        self.release(surface, monitor);
        self.text = text.to_string();
        if self.text.is_empty() {
            return true;
        }

        match encoder.encode(&self.text, &self.style) {
            Ok(bitmap) => {
                surface.set_texture(Some(&bitmap));
                self.bitmap = Some(bitmap);
                monitor.bitmap_generated(self.id);
            }
            Err(e) => {
                tracing::warn!("Session {} cannot render text as QR: {}", self.id, e);
            }
        }
        true
    }

    /// Set the text and make the widget visible
    pub fn set_and_show<S: DisplaySurface>(
        &mut self,
        text: Option<&str>,
        encoder: &dyn Encoder,
        surface: &mut S,
        monitor: &SessionMonitor,
    ) {
        self.set_text(text, encoder, surface, monitor);
        surface.show();
    }

    /// Drop the current bitmap, if any, and clear the widget texture
    pub fn release<S: DisplaySurface>(&mut self, surface: &mut S, monitor: &SessionMonitor) {
        if self.bitmap.take().is_some() {
            surface.set_texture(None);
            monitor.bitmap_released(self.id);
        }
    }
}

/// Run a full display session.
///
/// Instantiates the widget, renders `text`, shows it, then waits one frame at
/// a time until the widget is hidden (close button, external hide, or the
/// optional close timeout). The widget is destroyed on every exit path.
pub async fn run_display_session<F, C>(
    factory: &F,
    encoder: &dyn Encoder,
    clock: &mut C,
    settings: &DisplaySettings,
    text: &str,
    monitor: &SessionMonitor,
) -> Result<(), SessionError>
where
    F: DisplayFactory,
    C: FrameClock,
{
    let id = SessionId::next();
    monitor.session_started(id, SessionKind::Display);

    let surface = match factory.instantiate(settings) {
        Ok(surface) => surface,
        Err(e) => {
            monitor.session_resolved(id, SessionOutcome::Failed(e.to_string()));
            return Err(e);
        }
    };
    let mut widget = WidgetGuard::new(surface, id, monitor);
    let mut events = widget.subscribe();

    let mut session = DisplaySession::new(id, QrStyle::from(settings));
    session.set_and_show(Some(text), encoder, &mut *widget, monitor);
    tracing::info!("Session {} showing {} characters", id, session.text().chars().count());

    clock.tick().await;

    let mut deadline = Deadline::from_seconds(settings.close_timeout_seconds);
    let outcome = poll_until(clock, &mut deadline, || {
        loop {
            match events.try_recv() {
                Ok(WidgetEvent::ClosePressed) | Ok(WidgetEvent::CancelPressed) => widget.hide(),
                Ok(WidgetEvent::ScanPressed) => {}
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if widget.is_visible() { PollStep::Pending } else { PollStep::Ready(()) }
    })
    .await;

    if outcome == PollOutcome::TimedOut {
        tracing::debug!("Session {} close timeout reached", id);
        widget.hide();
    }

    session.release(&mut *widget, monitor);
    monitor.session_resolved(id, SessionOutcome::Closed);
    tracing::info!("Session {} closed", id);

    drop(events);
    drop(widget);
    Ok(())
}
