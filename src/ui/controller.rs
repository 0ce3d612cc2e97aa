// Session Controller - capture and display entry points for the host
//
// This module contains the SessionController which coordinates between:
// - the camera permission authority and fallback text buffer
// - the decoder and encoder services
// - the host frame clock
// - SessionMonitor (lifecycle events and metrics)
//
// It decides between the camera flow and the text-buffer fallback, runs one
// session at a time, and exposes a CancelHandle for external cancellation.

use crate::models::Settings;
use crate::services::{
    CameraAuthority, Decoder, Encoder, QrCodeGenEncoder, RqrrDecoder, TextBuffer,
};
use crate::session::{
    CaptureFactory, DisplayFactory, SessionError, run_capture_session, run_display_session,
};
use crate::state::SessionMonitor;
use crate::ui::bridge::FrameClock;
use std::sync::Arc;
use tokio::sync::watch;

/// External cancellation for the running capture session
///
/// Cloneable and usable from any thread; the session observes the flag once
/// per frame.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Capture and display entry points
///
/// # Example
/// ```ignore
/// let controller = SessionController::new(
///     settings,
///     StaticAuthority::granted(Platform::Android),
///     MemoryTextBuffer::default(),
///     IntervalClock::new(60),
/// );
/// let text = controller.capture(Some(&camera_factory)).await?;
/// controller.display(Some(&terminal_factory), "hello").await?;
/// ```
pub struct SessionController<A, T, K>
where
    A: CameraAuthority,
    T: TextBuffer,
    K: FrameClock,
{
    settings: Settings,
    authority: A,
    text_buffer: T,
    clock: K,
    decoder: Box<dyn Decoder>,
    encoder: Box<dyn Encoder>,
    monitor: Arc<SessionMonitor>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl<A, T, K> SessionController<A, T, K>
where
    A: CameraAuthority,
    T: TextBuffer,
    K: FrameClock,
{
    /// Create a controller using the rqrr decoder and qrcodegen encoder
    pub fn new(settings: Settings, authority: A, text_buffer: T, clock: K) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            settings,
            authority,
            text_buffer,
            clock,
            decoder: Box::new(RqrrDecoder::new()),
            encoder: Box::new(QrCodeGenEncoder::new()),
            monitor: Arc::new(SessionMonitor::new()),
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Share a monitor with other controllers or the host UI
    pub fn with_monitor(mut self, monitor: Arc<SessionMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn monitor(&self) -> &Arc<SessionMonitor> {
        &self.monitor
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Whether captures go through the camera on this platform
    pub fn uses_camera(&self) -> bool {
        let platform = self.authority.platform();
        platform.is_mobile() || (platform.has_camera_concept() && self.settings.capture.desktop_camera)
    }

    /// Contents of the fallback text buffer, verbatim
    pub fn read_fallback(&self) -> String {
        self.monitor.fallback_read();
        let text = self.text_buffer.read_text();
        tracing::info!("Read {} characters from the text buffer", text.chars().count());
        text
    }

    /// Read text through the camera, or from the text buffer when there is no
    /// widget factory or no camera on this platform.
    ///
    /// `Ok(None)` means the user cancelled, the timeout elapsed, or the widget
    /// found no rear camera.
    pub async fn capture<F: CaptureFactory>(
        &mut self,
        factory: Option<&F>,
    ) -> Result<Option<String>, SessionError> {
        let Some(factory) = factory.filter(|_| self.uses_camera()) else {
            return Ok(Some(self.read_fallback()));
        };

        self.cancel_tx.send_replace(false);
        let cancel = self.cancel_tx.subscribe();

        let result = run_capture_session(
            &mut self.authority,
            factory,
            self.decoder.as_ref(),
            &mut self.clock,
            &cancel,
            &self.settings.capture,
            &self.monitor,
        )
        .await;

        match result {
            Err(SessionError::NoDeviceAvailable) => Ok(Some(self.read_fallback())),
            other => other,
        }
    }

    /// Show `text` as a QR code until the widget is hidden. No-op without a factory.
    pub async fn display<F: DisplayFactory>(
        &mut self,
        factory: Option<&F>,
        text: &str,
    ) -> Result<(), SessionError> {
        let Some(factory) = factory else {
            tracing::debug!("No display widget supplied, nothing to show");
            return Ok(());
        };

        run_display_session(
            factory,
            self.encoder.as_ref(),
            &mut self.clock,
            &self.settings.display,
            text,
            &self.monitor,
        )
        .await
    }
}
