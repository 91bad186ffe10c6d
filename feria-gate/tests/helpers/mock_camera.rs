//! Scripted camera backend
//!
//! Frames are 1x1 pixels whose luma value is a marker: 0 is an empty frame,
//! 255 an ambiguous frame, and any other value indexes a payload registered
//! with [`FrameScript::push_code`]. [`MarkerDecoder`] reverses the mapping.

use feria_gate::camera::{
    CameraBackend, CameraDevice, CameraError, DeviceSelector, Facing, Frame, FrameSource,
    OpenedStream,
};
use feria_gate::scan::{CodeDecoder, DecodeAttempt, Window};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const BLANK: u8 = 0;
const AMBIGUOUS: u8 = 255;

enum Scripted {
    Marker(u8),
    Failure(CameraError),
}

/// Queue of frames served to whichever stream is open
#[derive(Default)]
pub struct FrameScript {
    queue: Mutex<VecDeque<Scripted>>,
    codes: Mutex<Vec<String>>,
}

impl FrameScript {
    /// Queue a frame containing `payload`
    pub fn push_code(&self, payload: &str) {
        let mut codes = self.codes.lock().unwrap();
        codes.push(payload.to_string());
        let marker = codes.len() as u8;
        assert!(marker < AMBIGUOUS, "too many scripted codes");
        self.queue.lock().unwrap().push_back(Scripted::Marker(marker));
    }

    pub fn push_blank(&self) {
        self.queue.lock().unwrap().push_back(Scripted::Marker(BLANK));
    }

    pub fn push_ambiguous(&self) {
        self.queue.lock().unwrap().push_back(Scripted::Marker(AMBIGUOUS));
    }

    /// Queue a stream failure
    pub fn push_failure(&self, error: CameraError) {
        self.queue.lock().unwrap().push_back(Scripted::Failure(error));
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    fn next_frame(&self) -> Result<Option<Frame>, CameraError> {
        match self.queue.lock().unwrap().pop_front() {
            Some(Scripted::Marker(marker)) => Ok(Frame::new(1, 1, vec![marker])),
            Some(Scripted::Failure(error)) => Err(error),
            None => Ok(Frame::new(1, 1, vec![BLANK])),
        }
    }

    fn decode_marker(&self, marker: u8) -> DecodeAttempt {
        match marker {
            BLANK => DecodeAttempt::NotFound,
            AMBIGUOUS => DecodeAttempt::Ambiguous(2),
            n => match self.codes.lock().unwrap().get(n as usize - 1) {
                Some(payload) => DecodeAttempt::Found(payload.clone()),
                None => DecodeAttempt::NotFound,
            },
        }
    }
}

/// Decoder for marker frames
pub struct MarkerDecoder {
    script: Arc<FrameScript>,
}

impl CodeDecoder for MarkerDecoder {
    fn decode(&self, frame: &Frame, window: Window) -> DecodeAttempt {
        self.script.decode_marker(frame.pixel(window.x, window.y))
    }
}

/// Open/release counters shared with the backend
#[derive(Clone, Default)]
pub struct CameraStats {
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl CameraStats {
    /// Streams successfully opened
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Streams released
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Streams open right now
    pub fn open_now(&self) -> usize {
        self.opens() - self.releases()
    }

    /// Selectors tried, in order (`facing=environment`, `device=rear`, ...)
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

/// A scripted camera
#[derive(Clone)]
pub struct MockCamera {
    pub device: CameraDevice,
    /// Error returned when this camera is requested, if any
    pub open_error: Option<CameraError>,
}

impl MockCamera {
    pub fn new(id: &str, facing: Option<Facing>) -> Self {
        Self {
            device: CameraDevice {
                id: id.to_string(),
                label: format!("{} camera", id),
                facing,
            },
            open_error: None,
        }
    }

    pub fn failing(mut self, error: CameraError) -> Self {
        self.open_error = Some(error);
        self
    }
}

/// Camera backend driven by a [`FrameScript`]
pub struct MockCameraBackend {
    cameras: Vec<MockCamera>,
    enumerate_error: Option<CameraError>,
    unavailable: AtomicBool,
    script: Arc<FrameScript>,
    stats: CameraStats,
}

impl MockCameraBackend {
    pub fn new(cameras: Vec<MockCamera>) -> Self {
        Self {
            cameras,
            enumerate_error: None,
            unavailable: AtomicBool::new(false),
            script: Arc::new(FrameScript::default()),
            stats: CameraStats::default(),
        }
    }

    /// Rear (`rear`, environment) and front (`front`, user) cameras
    pub fn rear_and_front() -> Self {
        Self::new(vec![
            MockCamera::new("rear", Some(Facing::Environment)),
            MockCamera::new("front", Some(Facing::User)),
        ])
    }

    pub fn with_enumerate_error(mut self, error: CameraError) -> Self {
        self.enumerate_error = Some(error);
        self
    }

    /// Make every open fail with `DeviceBusy` and enumeration return nothing
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn script(&self) -> Arc<FrameScript> {
        Arc::clone(&self.script)
    }

    pub fn stats(&self) -> CameraStats {
        self.stats.clone()
    }

    pub fn decoder(&self) -> MarkerDecoder {
        MarkerDecoder {
            script: self.script(),
        }
    }
}

impl CameraBackend for MockCameraBackend {
    fn devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        if let Some(error) = &self.enumerate_error {
            return Err(error.clone());
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(self.cameras.iter().map(|c| c.device.clone()).collect())
    }

    fn open_stream(&self, selector: &DeviceSelector) -> Result<OpenedStream, CameraError> {
        self.stats.attempts.lock().unwrap().push(selector.to_string());

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CameraError::DeviceBusy("scripted outage".to_string()));
        }

        let camera = self
            .cameras
            .iter()
            .find(|c| match selector {
                DeviceSelector::Facing(facing) => c.device.facing == Some(*facing),
                DeviceSelector::DeviceId(id) => &c.device.id == id,
            })
            .ok_or(CameraError::NoCameraAvailable)?;

        if let Some(error) = &camera.open_error {
            return Err(error.clone());
        }

        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        Ok(OpenedStream {
            device: camera.device.clone(),
            source: Box::new(MockSource {
                script: self.script(),
                stats: self.stats.clone(),
            }),
        })
    }
}

struct MockSource {
    script: Arc<FrameScript>,
    stats: CameraStats,
}

impl FrameSource for MockSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        self.script.next_frame()
    }

    fn release(&mut self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}
