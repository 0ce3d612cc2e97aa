//! Shared fakes for the integration tests
//!
//! - `ScriptedBackend`: camera backend serving one fixed frame, counting opens and stops
//! - `FakeDisplayFactory`: display widget recording textures and visibility
//! - `MockFrameDecoder`: mockall double for the decoder

#![allow(dead_code)]

use qrlink::models::{DisplaySettings, Settings};
use qrlink::services::{
    CameraBackend, CameraDevice, DecodeError, Decoder, Encoder, Frame, FrameSource,
    FrameSourceError, MemoryTextBuffer, QrBitmap, QrCodeGenEncoder, QrStyle, StaticAuthority,
};
use qrlink::session::{DisplayFactory, DisplaySurface, SessionError, Widget, WidgetEvent};
use qrlink::ui::{
    CameraSurfaceFactory, CaptureLayout, DisplayLayout, FixedStepClock, SessionController,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

mockall::mock! {
    pub FrameDecoder {}

    impl Decoder for FrameDecoder {
        fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Result<Option<String>, DecodeError>;
    }
}

pub const FRAME_STEP: Duration = Duration::from_millis(16);

pub type TestController = SessionController<StaticAuthority, MemoryTextBuffer, FixedStepClock>;

pub fn new_controller(authority: StaticAuthority, settings: Settings) -> TestController {
    SessionController::new(
        settings,
        authority,
        MemoryTextBuffer::new("clipboard text"),
        FixedStepClock::new(FRAME_STEP),
    )
}

/// A QR frame of `text`, encoded at a small scale
pub fn qr_frame(text: &str) -> Frame {
    let style = QrStyle {
        module_scale: 4,
        ..QrStyle::default()
    };
    let bitmap = QrCodeGenEncoder::new()
        .encode(text, &style)
        .expect("test text fits in a QR symbol");
    let (width, height) = bitmap.image.dimensions();
    Frame::new(bitmap.image.into_raw(), width, height)
}

pub fn blank_frame() -> Frame {
    Frame::new(vec![255; 8 * 8 * 4], 8, 8)
}

#[derive(Debug, Default)]
pub struct CameraLog {
    pub opens: AtomicUsize,
    pub stops: AtomicUsize,
}

impl CameraLog {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSource {
    frame: Frame,
    running: bool,
    log: Arc<CameraLog>,
}

impl FrameSource for ScriptedSource {
    fn start(&mut self) -> Result<(), FrameSourceError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        self.log.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        if !self.running {
            return Err(FrameSourceError::NotStarted);
        }
        Ok(Some(self.frame.clone()))
    }
}

pub struct ScriptedBackend {
    pub devices: Vec<CameraDevice>,
    pub frame: Frame,
    pub log: Arc<CameraLog>,
}

impl ScriptedBackend {
    /// One front camera followed by one rear camera
    pub fn new(frame: Frame) -> Self {
        Self {
            devices: vec![
                CameraDevice {
                    name: "front".into(),
                    front_facing: true,
                },
                CameraDevice {
                    name: "rear".into(),
                    front_facing: false,
                },
            ],
            frame,
            log: Arc::new(CameraLog::default()),
        }
    }

    pub fn front_only(frame: Frame) -> Self {
        let mut backend = Self::new(frame);
        backend.devices.retain(|d| d.front_facing);
        backend
    }
}

impl CameraBackend for ScriptedBackend {
    type Source = ScriptedSource;

    fn devices(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }

    fn open(&self, device: &CameraDevice, _resolution: u32) -> Result<Self::Source, FrameSourceError> {
        assert!(!device.front_facing, "only rear cameras are opened");
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSource {
            frame: self.frame.clone(),
            running: false,
            log: Arc::clone(&self.log),
        })
    }
}

/// Camera factory over a scripted backend, plus its log
pub fn camera(backend: ScriptedBackend, layout: CaptureLayout) -> (CameraSurfaceFactory<ScriptedBackend>, Arc<CameraLog>) {
    let log = Arc::clone(&backend.log);
    (CameraSurfaceFactory::new(backend, layout), log)
}

#[derive(Debug, Default)]
pub struct DisplayLog {
    pub textures: Vec<Option<QrBitmap>>,
    pub visible: bool,
    pub shows: usize,
    pub destroys: usize,
}

pub struct FakeDisplay {
    log: Arc<Mutex<DisplayLog>>,
    events: broadcast::Sender<WidgetEvent>,
}

impl Widget for FakeDisplay {
    fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    fn destroy(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.visible = false;
        log.destroys += 1;
    }
}

impl DisplaySurface for FakeDisplay {
    fn set_texture(&mut self, bitmap: Option<&QrBitmap>) {
        self.log.lock().unwrap().textures.push(bitmap.cloned());
    }

    fn show(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.visible = true;
        log.shows += 1;
    }

    fn hide(&mut self) {
        self.log.lock().unwrap().visible = false;
    }

    fn is_visible(&self) -> bool {
        self.log.lock().unwrap().visible
    }
}

pub struct FakeDisplayFactory {
    pub log: Arc<Mutex<DisplayLog>>,
    pub layout: DisplayLayout,
    events: broadcast::Sender<WidgetEvent>,
}

impl FakeDisplayFactory {
    pub fn new() -> Self {
        Self {
            log: Arc::default(),
            layout: DisplayLayout::standard(),
            events: broadcast::channel(16).0,
        }
    }

    pub fn press_close(&self) -> bool {
        self.events.send(WidgetEvent::ClosePressed).is_ok()
    }

    pub fn is_visible(&self) -> bool {
        self.log.lock().unwrap().visible
    }

    /// Hide the widget from outside the session
    pub fn hide(&self) {
        self.log.lock().unwrap().visible = false;
    }

    /// Last texture handed to the widget
    pub fn last_texture(&self) -> Option<QrBitmap> {
        self.log.lock().unwrap().textures.last().cloned().flatten()
    }
}

impl DisplayFactory for FakeDisplayFactory {
    type Surface = FakeDisplay;

    fn instantiate(&self, _settings: &DisplaySettings) -> Result<FakeDisplay, SessionError> {
        self.layout.validate()?;
        Ok(FakeDisplay {
            log: Arc::clone(&self.log),
            events: self.events.clone(),
        })
    }
}
