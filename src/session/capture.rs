//! Capture session: permission gate, camera widget, decode loop, teardown.

use super::poll::{Deadline, PollOutcome, PollStep, poll_until};
use super::widget::{CaptureFactory, CaptureSurface, Widget, WidgetEvent, WidgetGuard};
use super::SessionError;
use crate::models::{CaptureSettings, SessionId, SessionKind, SessionOutcome};
use crate::services::{CameraAuthority, Decoder, GateOutcome, ensure_camera_access};
use crate::state::SessionMonitor;
use crate::ui::bridge::FrameClock;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;

/// Per-session capture state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub id: SessionId,
    pub cancelled: bool,
    /// Configured auto-cancel limit
    pub deadline: Deadline,
    pub decoded: Option<String>,
    /// A scan press is waiting to be served (scan-button mode only)
    pub scan_pending: bool,
    pub decode_failures: u64,
}

impl CaptureSession {
    pub fn new(id: SessionId, settings: &CaptureSettings) -> Self {
        Self {
            id,
            cancelled: false,
            deadline: Deadline::from_seconds(settings.cancel_timeout_seconds),
            decoded: None,
            scan_pending: false,
            decode_failures: 0,
        }
    }

    /// One poll iteration: apply user actions, then try to decode the current frame.
    pub fn poll_once<S: CaptureSurface>(
        &mut self,
        surface: &mut S,
        events: &mut broadcast::Receiver<WidgetEvent>,
        cancel: &watch::Receiver<bool>,
        decoder: &dyn Decoder,
        monitor: &SessionMonitor,
    ) -> PollStep<String> {
        loop {
            match events.try_recv() {
                Ok(WidgetEvent::CancelPressed) | Ok(WidgetEvent::ClosePressed) => self.cancelled = true,
                Ok(WidgetEvent::ScanPressed) => self.scan_pending = true,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Session {} missed {} widget events", self.id, skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if *cancel.borrow() {
            self.cancelled = true;
        }
        if self.cancelled {
            return PollStep::Cancel;
        }

        let frame = match surface.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return PollStep::Pending,
            Err(e) => {
                tracing::debug!("Session {} frame unavailable: {}", self.id, e);
                return PollStep::Pending;
            }
        };
        surface.set_orientation(-frame.rotation);

        let scan_now = !surface.scan_on_demand() || std::mem::take(&mut self.scan_pending);
        if !scan_now {
            return PollStep::Pending;
        }

        monitor.metrics().record_frame_polled();
        match decoder.decode(&frame.pixels, frame.width, frame.height) {
            Ok(Some(text)) => {
                self.decoded = Some(text.clone());
                PollStep::Ready(text)
            }
            Ok(None) => PollStep::Pending,
            Err(e) => {
                // Unreadable frames are routine on a live feed; retry next frame
                self.decode_failures += 1;
                monitor.metrics().record_decode_failure();
                if self.decode_failures == 1 {
                    tracing::debug!("Session {} decode failed: {}", self.id, e);
                } else {
                    tracing::trace!("Session {} decode failed: {}", self.id, e);
                }
                PollStep::Pending
            }
        }
    }
}

/// Run a full capture session.
///
/// Returns `Ok(Some(text))` on a successful decode and `Ok(None)` when the
/// user cancels, the timeout elapses, or the widget has no camera. Fails with
/// [`SessionError::PermissionDenied`] before any widget exists when the user
/// refuses camera access, and with [`SessionError::NoDeviceAvailable`] when the
/// platform has no camera at all.
pub async fn run_capture_session<A, F, C>(
    authority: &mut A,
    factory: &F,
    decoder: &dyn Decoder,
    clock: &mut C,
    cancel: &watch::Receiver<bool>,
    settings: &CaptureSettings,
    monitor: &SessionMonitor,
) -> Result<Option<String>, SessionError>
where
    A: CameraAuthority,
    F: CaptureFactory,
    C: FrameClock,
{
    if ensure_camera_access(authority).await? == GateOutcome::Unavailable {
        return Err(SessionError::NoDeviceAvailable);
    }

    let id = SessionId::next();
    monitor.session_started(id, SessionKind::Capture);

    let surface = match factory.instantiate(settings) {
        Ok(surface) => surface,
        Err(e) => {
            monitor.session_resolved(id, SessionOutcome::Failed(e.to_string()));
            return Err(e);
        }
    };
    let mut widget = WidgetGuard::new(surface, id, monitor);
    let mut events = widget.subscribe();

    if !widget.has_device() {
        tracing::warn!("Session {} has no rear camera, resolving without text", id);
        monitor.session_resolved(id, SessionOutcome::NoDevice);
        return Ok(None);
    }

    for _ in 0..settings.settle_frames {
        clock.tick().await;
    }

    let mut session = CaptureSession::new(id, settings);
    let mut deadline = session.deadline;
    tracing::info!(
        "Session {} scanning (timeout: {:?}, scan button: {})",
        id,
        deadline.limit(),
        widget.scan_on_demand()
    );

    let outcome = poll_until(clock, &mut deadline, || {
        session.poll_once(&mut *widget, &mut events, cancel, decoder, monitor)
    })
    .await;
    session.deadline = deadline;

    let (result, resolution) = match outcome {
        PollOutcome::Ready(text) => (Some(text), SessionOutcome::Decoded),
        PollOutcome::Cancelled => (None, SessionOutcome::Cancelled),
        PollOutcome::TimedOut => {
            session.cancelled = true;
            (None, SessionOutcome::TimedOut)
        }
    };
    tracing::info!(
        "Session {} {} after {:?} ({} unreadable frames)",
        id,
        resolution.as_str(),
        session.deadline.elapsed(),
        session.decode_failures
    );
    monitor.session_resolved(id, resolution);

    drop(events);
    drop(widget);
    Ok(result)
}
