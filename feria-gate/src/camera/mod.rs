//! Camera acquisition
//!
//! The platform capability is abstracted behind [`CameraBackend`] (enumerate
//! devices, open a stream) and [`FrameSource`] (pull frames, release). The
//! [`CameraManager`] owns the single open [`CameraHandle`] and implements the
//! acquisition fallback cascade.

pub mod frame_dir;
pub mod manager;

pub use frame_dir::{FrameDirectoryBackend, FrameDirectoryDevice};
pub use manager::{CameraHandle, CameraManager};

use feria_common::events::CameraErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Camera acquisition failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("No camera available")]
    NoCameraAvailable,

    #[error("Camera busy: {0}")]
    DeviceBusy(String),
}

impl CameraError {
    pub fn kind(&self) -> CameraErrorKind {
        match self {
            CameraError::PermissionDenied(_) => CameraErrorKind::PermissionDenied,
            CameraError::NoCameraAvailable => CameraErrorKind::NoCameraAvailable,
            CameraError::DeviceBusy(_) => CameraErrorKind::DeviceBusy,
        }
    }
}

/// Which way a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointing away from the operator
    Environment,
    /// Front camera, pointing at the operator
    User,
}

impl Facing {
    pub fn opposite(self) -> Facing {
        match self {
            Facing::Environment => Facing::User,
            Facing::User => Facing::Environment,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Environment => f.write_str("environment"),
            Facing::User => f.write_str("user"),
        }
    }
}

/// How a stream is requested from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    Facing(Facing),
    DeviceId(String),
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Facing(facing) => write!(f, "facing={}", facing),
            DeviceSelector::DeviceId(id) => write!(f, "device={}", id),
        }
    }
}

/// A capture device as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub facing: Option<Facing>,
}

/// One grayscale video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl Frame {
    /// Create a frame from row-major 8-bit luma samples
    ///
    /// Returns `None` if `luma.len() != width * height`.
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Option<Self> {
        if luma.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { width, height, luma })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    /// Luma at (x, y); callers stay within bounds
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.luma[y as usize * self.width as usize + x as usize]
    }
}

/// A live stream of frames from one device
pub trait FrameSource: Send {
    /// Pull the next frame
    ///
    /// `Ok(None)` means no frame is ready yet. An error means the stream was
    /// lost and the device must be reacquired.
    fn read_frame(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Release the underlying device. Called exactly once by [`CameraHandle`].
    fn release(&mut self);
}

/// A stream returned by [`CameraBackend::open_stream`]
pub struct OpenedStream {
    pub device: CameraDevice,
    pub source: Box<dyn FrameSource>,
}

/// Platform camera capability
pub trait CameraBackend: Send + Sync {
    /// Enumerate available capture devices
    fn devices(&self) -> Result<Vec<CameraDevice>, CameraError>;

    /// Open a stream for the given selector
    fn open_stream(&self, selector: &DeviceSelector) -> Result<OpenedStream, CameraError>;
}
