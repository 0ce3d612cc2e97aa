// Camera surface - default capture widget over a CameraBackend
//
// The widget owns its frame source: opened at instantiation on the first
// rear-facing device, stopped on destroy. Each widget gets its own event
// channel; the factory's button handle follows the newest widget.

use crate::models::{AspectMode, CaptureSettings};
use crate::services::{CameraBackend, CameraDevice, Frame, FrameSource, FrameSourceError, select_rear_camera};
use crate::session::{CaptureFactory, CaptureSurface, SessionError, Widget, WidgetEvent};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Reference area the preview is laid out in
pub const PREVIEW_AREA: (f32, f32) = (1920.0, 1080.0);

const EVENT_CAPACITY: usize = 16;

/// Where a child element sits relative to its widget root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    DirectChild,
    /// Present but buried under another child
    Nested,
}

fn check_child(name: &str, placement: Option<Placement>, required: bool) -> Result<(), SessionError> {
    match placement {
        Some(Placement::DirectChild) => Ok(()),
        Some(Placement::Nested) => Err(SessionError::Configuration(format!(
            "{name} must be a direct child of the widget"
        ))),
        None if required => Err(SessionError::Configuration(format!("{name} is missing"))),
        None => Ok(()),
    }
}

/// Child elements of a capture widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLayout {
    pub capture_target: Option<Placement>,
    pub scan_button: Option<Placement>,
    pub cancel_button: Option<Placement>,
}

impl CaptureLayout {
    /// Preview plus a cancel button, decoding every frame
    pub fn standard() -> Self {
        Self {
            capture_target: Some(Placement::DirectChild),
            scan_button: None,
            cancel_button: Some(Placement::DirectChild),
        }
    }

    /// Add a scan button; decoding then only happens on a press
    pub fn with_scan_button(mut self) -> Self {
        self.scan_button = Some(Placement::DirectChild);
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        check_child("capture target", self.capture_target, true)?;
        check_child("scan button", self.scan_button, false)?;
        check_child("cancel button", self.cancel_button, false)
    }
}

impl Default for CaptureLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// Child elements of a display widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLayout {
    pub display_target: Option<Placement>,
    pub close_button: Option<Placement>,
}

impl DisplayLayout {
    pub fn standard() -> Self {
        Self {
            display_target: Some(Placement::DirectChild),
            close_button: Some(Placement::DirectChild),
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        check_child("display target", self.display_target, true)?;
        check_child("close button", self.close_button, false)
    }
}

impl Default for DisplayLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// Event channel of the most recently instantiated widget of a factory
#[derive(Debug, Clone, Default)]
pub(crate) struct ButtonRouter {
    current: Arc<Mutex<Option<broadcast::Sender<WidgetEvent>>>>,
}

impl ButtonRouter {
    /// Open a fresh channel for a new widget and route later presses to it
    pub(crate) fn attach(&self) -> broadcast::Sender<WidgetEvent> {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx.clone());
        tx
    }

    fn send(&self, event: WidgetEvent) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }
}

/// Handle for pressing a widget's buttons from outside the session
///
/// Presses reach only the newest widget of the factory that issued the
/// handle, and only buttons present in its layout can be pressed.
#[derive(Debug, Clone)]
pub struct WidgetButtons {
    router: ButtonRouter,
    cancel: bool,
    scan: bool,
    close: bool,
}

impl WidgetButtons {
    pub(crate) fn for_capture(router: ButtonRouter, layout: &CaptureLayout) -> Self {
        Self {
            router,
            cancel: layout.cancel_button.is_some(),
            scan: layout.scan_button.is_some(),
            close: false,
        }
    }

    pub(crate) fn for_display(router: ButtonRouter, layout: &DisplayLayout) -> Self {
        Self {
            router,
            cancel: false,
            scan: false,
            close: layout.close_button.is_some(),
        }
    }

    /// Returns `false` when the layout has no such button or no session is listening
    pub fn press_cancel(&self) -> bool {
        self.cancel && self.router.send(WidgetEvent::CancelPressed)
    }

    pub fn press_scan(&self) -> bool {
        self.scan && self.router.send(WidgetEvent::ScanPressed)
    }

    pub fn press_close(&self) -> bool {
        self.close && self.router.send(WidgetEvent::ClosePressed)
    }
}

/// Capture widget backed by a frame source
pub struct CameraSurface<S: FrameSource> {
    source: Option<S>,
    device: Option<CameraDevice>,
    events: broadcast::Sender<WidgetEvent>,
    scan_button: bool,
    orientation: i32,
    preview_size: (f32, f32),
}

impl<S: FrameSource> CameraSurface<S> {
    pub fn device(&self) -> Option<&CameraDevice> {
        self.device.as_ref()
    }

    /// Current preview rotation in degrees
    pub fn orientation(&self) -> i32 {
        self.orientation
    }

    pub fn preview_size(&self) -> (f32, f32) {
        self.preview_size
    }
}

impl<S: FrameSource> Widget for CameraSurface<S> {
    fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    fn destroy(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
            if let Some(device) = &self.device {
                tracing::debug!("Stopped camera {}", device.name);
            }
        }
    }
}

impl<S: FrameSource> CaptureSurface for CameraSurface<S> {
    fn has_device(&self) -> bool {
        self.source.is_some()
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        match self.source.as_mut() {
            Some(source) => source.current_frame(),
            None => Ok(None),
        }
    }

    fn scan_on_demand(&self) -> bool {
        self.scan_button
    }

    fn set_orientation(&mut self, degrees: i32) {
        self.orientation = degrees;
    }
}

/// Builds [`CameraSurface`]s on the first rear-facing device of a backend
pub struct CameraSurfaceFactory<B: CameraBackend> {
    backend: B,
    layout: CaptureLayout,
    router: ButtonRouter,
}

impl<B: CameraBackend> CameraSurfaceFactory<B> {
    pub fn new(backend: B, layout: CaptureLayout) -> Self {
        Self {
            backend,
            layout,
            router: ButtonRouter::default(),
        }
    }

    pub fn layout(&self) -> &CaptureLayout {
        &self.layout
    }

    /// Buttons of the newest widget this factory creates
    pub fn buttons(&self) -> WidgetButtons {
        WidgetButtons::for_capture(self.router.clone(), &self.layout)
    }

    fn open_rear_camera(&self, resolution: u32) -> Option<(B::Source, CameraDevice)> {
        let devices = self.backend.devices();
        let Some(device) = select_rear_camera(&devices) else {
            tracing::warn!("No rear-facing camera among {} device(s)", devices.len());
            return None;
        };

        let opened = self.backend.open(device, resolution).and_then(|mut source| {
            source.start()?;
            Ok(source)
        });
        match opened {
            Ok(source) => {
                tracing::info!("Opened camera {} at {}x{}", device.name, resolution, resolution);
                Some((source, device.clone()))
            }
            Err(e) => {
                tracing::warn!("Failed to open camera {}: {}", device.name, e);
                None
            }
        }
    }
}

impl<B: CameraBackend> CaptureFactory for CameraSurfaceFactory<B> {
    type Surface = CameraSurface<B::Source>;

    fn instantiate(&self, settings: &CaptureSettings) -> Result<Self::Surface, SessionError> {
        self.layout.validate()?;

        let (source, device) = match self.open_rear_camera(settings.resolution) {
            Some((source, device)) => (Some(source), Some(device)),
            None => (None, None),
        };

        Ok(CameraSurface {
            source,
            device,
            events: self.router.attach(),
            scan_button: self.layout.scan_button.is_some(),
            orientation: 0,
            preview_size: settings.aspect_mode.fit(PREVIEW_AREA.0, PREVIEW_AREA.1),
        })
    }
}

/// On-screen size of a display widget's QR; display always fits inside its area
pub fn display_size(width: f32, height: f32) -> (f32, f32) {
    AspectMode::FitInParent.fit(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StillImageSource;

    struct OneFrameBackend {
        devices: Vec<CameraDevice>,
    }

    impl CameraBackend for OneFrameBackend {
        type Source = StillImageSource;

        fn devices(&self) -> Vec<CameraDevice> {
            self.devices.clone()
        }

        fn open(&self, _device: &CameraDevice, _resolution: u32) -> Result<Self::Source, FrameSourceError> {
            Ok(StillImageSource::new(Frame::new(vec![255; 16], 2, 2).with_rotation(90)))
        }
    }

    fn backend(front_facing: &[bool]) -> OneFrameBackend {
        OneFrameBackend {
            devices: front_facing
                .iter()
                .enumerate()
                .map(|(i, &front_facing)| CameraDevice {
                    name: format!("cam{i}"),
                    front_facing,
                })
                .collect(),
        }
    }

    #[test]
    fn test_layout_requires_direct_capture_target() {
        assert!(CaptureLayout::standard().validate().is_ok());

        let missing = CaptureLayout {
            capture_target: None,
            ..CaptureLayout::standard()
        };
        assert!(matches!(missing.validate(), Err(SessionError::Configuration(_))));

        let nested = CaptureLayout {
            capture_target: Some(Placement::Nested),
            ..CaptureLayout::standard()
        };
        assert!(matches!(nested.validate(), Err(SessionError::Configuration(_))));
    }

    #[test]
    fn test_layout_rejects_nested_buttons() {
        let layout = CaptureLayout {
            scan_button: Some(Placement::Nested),
            ..CaptureLayout::standard()
        };
        assert!(layout.validate().is_err());

        let display = DisplayLayout {
            close_button: Some(Placement::Nested),
            ..DisplayLayout::standard()
        };
        assert!(display.validate().is_err());

        let no_target = DisplayLayout {
            display_target: None,
            close_button: None,
        };
        assert!(no_target.validate().is_err());
    }

    #[test]
    fn test_factory_opens_rear_camera() {
        let factory = CameraSurfaceFactory::new(backend(&[true, false]), CaptureLayout::standard());
        let mut surface = factory.instantiate(&CaptureSettings::default()).unwrap();

        assert!(surface.has_device());
        assert_eq!(surface.device().unwrap().name, "cam1");
        assert!(!surface.scan_on_demand());
        assert_eq!(surface.preview_size(), (1920.0, 1920.0));

        let frame = surface.read_frame().unwrap().unwrap();
        assert_eq!(frame.rotation, 90);

        surface.destroy();
        assert!(!surface.has_device());
    }

    #[test]
    fn test_factory_without_rear_camera_has_no_device() {
        let factory = CameraSurfaceFactory::new(backend(&[true]), CaptureLayout::standard());
        let mut surface = factory.instantiate(&CaptureSettings::default()).unwrap();

        assert!(!surface.has_device());
        assert!(surface.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_factory_rejects_bad_layout_before_opening() {
        let layout = CaptureLayout {
            capture_target: None,
            ..CaptureLayout::standard()
        };
        let factory = CameraSurfaceFactory::new(backend(&[false]), layout);
        assert!(factory.instantiate(&CaptureSettings::default()).is_err());
    }

    #[test]
    fn test_buttons_reach_subscribed_widget() {
        let factory = CameraSurfaceFactory::new(backend(&[false]), CaptureLayout::standard().with_scan_button());
        let buttons = factory.buttons();
        assert!(!buttons.press_scan());

        let surface = factory.instantiate(&CaptureSettings::default()).unwrap();
        assert!(surface.scan_on_demand());
        let mut rx = surface.subscribe();

        assert!(buttons.press_scan());
        assert!(buttons.press_cancel());
        assert_eq!(rx.try_recv().unwrap(), WidgetEvent::ScanPressed);
        assert_eq!(rx.try_recv().unwrap(), WidgetEvent::CancelPressed);
    }

    #[test]
    fn test_buttons_reach_only_newest_widget() {
        let factory = CameraSurfaceFactory::new(backend(&[false]), CaptureLayout::standard());
        let buttons = factory.buttons();

        let first = factory.instantiate(&CaptureSettings::default()).unwrap();
        let mut first_rx = first.subscribe();
        let second = factory.instantiate(&CaptureSettings::default()).unwrap();
        let mut second_rx = second.subscribe();

        assert!(buttons.press_cancel());
        assert_eq!(second_rx.try_recv().unwrap(), WidgetEvent::CancelPressed);
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn test_buttons_missing_from_layout_cannot_be_pressed() {
        let layout = CaptureLayout {
            cancel_button: None,
            ..CaptureLayout::standard()
        };
        let factory = CameraSurfaceFactory::new(backend(&[false]), layout);
        let surface = factory.instantiate(&CaptureSettings::default()).unwrap();
        let mut rx = surface.subscribe();
        let buttons = factory.buttons();

        assert!(!buttons.press_cancel());
        assert!(!buttons.press_scan());
        assert!(!buttons.press_close());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_display_always_fits_in_parent() {
        assert_eq!(display_size(800.0, 600.0), (600.0, 600.0));
        assert_eq!(display_size(300.0, 500.0), (300.0, 300.0));
    }
}
