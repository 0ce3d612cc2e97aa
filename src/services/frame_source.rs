//! Camera frame sources.
//!
//! A [`FrameSource`] is a live feed that must be started before the first
//! read and stopped on teardown. A [`CameraBackend`] enumerates devices and
//! opens sources on them. The still-image backend lets a picture on disk
//! stand in for a rear camera, which is what the command line uses.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// One RGBA8 frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Row-major RGBA8 pixels, `width * height * 4` bytes
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation of the sensor image, in degrees
    pub rotation: i32,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
            rotation: 0,
        }
    }

    pub fn with_rotation(mut self, rotation: i32) -> Self {
        self.rotation = rotation;
        self
    }
}

#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("frame source read before start")]
    NotStarted,

    #[error("device {0} could not be opened")]
    Unavailable(String),
}

/// A live feed of frames
pub trait FrameSource {
    /// Begin producing frames
    fn start(&mut self) -> Result<(), FrameSourceError>;

    /// Stop producing frames and release the device
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Latest frame, `None` when nothing has been produced yet
    fn current_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;
}

/// A camera known to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub front_facing: bool,
}

/// Enumerates camera devices and opens frame sources on them
pub trait CameraBackend {
    type Source: FrameSource;

    fn devices(&self) -> Vec<CameraDevice>;

    /// Open a source on `device` requesting a `resolution` x `resolution` feed
    fn open(&self, device: &CameraDevice, resolution: u32) -> Result<Self::Source, FrameSourceError>;
}

/// First device that is not front-facing
pub fn select_rear_camera(devices: &[CameraDevice]) -> Option<&CameraDevice> {
    devices.iter().find(|d| !d.front_facing)
}

/// Serves a single decoded image as if it were a camera feed
#[derive(Debug)]
pub struct StillImageSource {
    frame: Frame,
    running: bool,
}

impl StillImageSource {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            running: false,
        }
    }

    /// Load an image file, downscaling it to fit within `resolution` pixels per side
    pub fn load(path: &Utf8Path, resolution: u32) -> Result<Self, FrameSourceError> {
        let mut img = image::open(path)?;
        if resolution > 0 && (img.width() > resolution || img.height() > resolution) {
            img = img.resize(resolution, resolution, image::imageops::FilterType::Triangle);
        }
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!("Loaded still image {} ({}x{})", path, width, height);
        Ok(Self::new(Frame::new(rgba.into_raw(), width, height)))
    }
}

impl FrameSource for StillImageSource {
    fn start(&mut self) -> Result<(), FrameSourceError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
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

/// Backend exposing one image file as a rear camera
#[derive(Debug, Clone)]
pub struct StillImageBackend {
    path: Utf8PathBuf,
}

impl StillImageBackend {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CameraBackend for StillImageBackend {
    type Source = StillImageSource;

    fn devices(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: self.path.to_string(),
            front_facing: false,
        }]
    }

    fn open(&self, _device: &CameraDevice, resolution: u32) -> Result<Self::Source, FrameSourceError> {
        StillImageSource::load(&self.path, resolution)
    }
}
