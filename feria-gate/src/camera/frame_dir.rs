//! Frame-directory camera backend
//!
//! Each configured device is a directory of still images that is replayed in
//! a loop, one image per frame. Used for station rehearsal, kiosk demos and
//! integration tests; hardware backends plug into the same [`CameraBackend`]
//! trait.
//!
//! Images are decoded on a per-stream thread into a small bounded queue, so
//! file I/O and JPEG decoding never run on the async session task.
//! `read_frame` only takes what is ready.
//!
//! Error mapping:
//! - no configured device matches the selector: `NoCameraAvailable`
//! - device already streaming: `DeviceBusy`
//! - directory unreadable: `PermissionDenied`
//! - directory missing, not a directory, or holding no images: `NoCameraAvailable`
//! - every image in the directory fails to decode: stream lost, `NoCameraAvailable`

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, warn};

use super::{
    CameraBackend, CameraDevice, CameraError, DeviceSelector, Facing, Frame, FrameSource,
    OpenedStream,
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Decoded frames buffered ahead of the scan loop
const PREFETCH_FRAMES: usize = 2;

/// A configured frame-directory device (`[[camera.devices]]` in the config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDirectoryDevice {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub facing: Option<Facing>,
    /// Directory holding the frame images
    pub frames: PathBuf,
}

impl FrameDirectoryDevice {
    fn describe(&self) -> CameraDevice {
        CameraDevice {
            id: self.id.clone(),
            label: self.label.clone(),
            facing: self.facing,
        }
    }
}

type InUse = Arc<Mutex<HashSet<String>>>;

/// Camera backend replaying image directories
pub struct FrameDirectoryBackend {
    devices: Vec<FrameDirectoryDevice>,
    in_use: InUse,
}

impl FrameDirectoryBackend {
    pub fn new(devices: Vec<FrameDirectoryDevice>) -> Self {
        Self {
            devices,
            in_use: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn find(&self, selector: &DeviceSelector) -> Option<&FrameDirectoryDevice> {
        match selector {
            DeviceSelector::Facing(facing) => {
                self.devices.iter().find(|d| d.facing == Some(*facing))
            }
            DeviceSelector::DeviceId(id) => self.devices.iter().find(|d| &d.id == id),
        }
    }
}

impl CameraBackend for FrameDirectoryBackend {
    fn devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        Ok(self.devices.iter().map(FrameDirectoryDevice::describe).collect())
    }

    fn open_stream(&self, selector: &DeviceSelector) -> Result<OpenedStream, CameraError> {
        let device = self.find(selector).ok_or(CameraError::NoCameraAvailable)?;

        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        if in_use.contains(&device.id) {
            return Err(CameraError::DeviceBusy(format!(
                "{} is already streaming",
                device.id
            )));
        }

        let frames = list_frames(&device.frames)?;
        if frames.is_empty() {
            warn!(device = %device.id, dir = %device.frames.display(), "Frame directory holds no images");
            return Err(CameraError::NoCameraAvailable);
        }

        let (tx, rx) = mpsc::sync_channel(PREFETCH_FRAMES);
        let device_id = device.id.clone();
        thread::Builder::new()
            .name(format!("feria-frames-{}", device.id))
            .spawn(move || decode_frames(&device_id, &frames, tx))
            .map_err(|e| CameraError::DeviceBusy(format!("{}: {}", device.id, e)))?;

        in_use.insert(device.id.clone());
        debug!(device = %device.id, "Frame directory stream opened");

        Ok(OpenedStream {
            device: device.describe(),
            source: Box::new(FrameDirectorySource {
                device_id: device.id.clone(),
                frames: Some(rx),
                in_use: Arc::clone(&self.in_use),
            }),
        })
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => {
            CameraError::PermissionDenied(format!("{}: {}", dir.display(), e))
        }
        _ => {
            warn!(dir = %dir.display(), "Frame directory unusable: {}", e);
            CameraError::NoCameraAvailable
        }
    })?;

    let mut frames: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    frames.sort();
    Ok(frames)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode `frames` in a loop until the receiver is dropped
///
/// Unreadable files are skipped. A full pass without a single decodable
/// image ends the thread, which the reader sees as a lost stream.
fn decode_frames(device_id: &str, frames: &[PathBuf], tx: SyncSender<Frame>) {
    loop {
        let mut decoded = 0;
        for path in frames {
            let frame = match image::open(path) {
                Ok(image) => {
                    let luma = image.to_luma8();
                    let (width, height) = luma.dimensions();
                    Frame::new(width, height, luma.into_raw())
                }
                Err(e) => {
                    warn!(device = %device_id, file = %path.display(), "Skipping unreadable frame: {}", e);
                    None
                }
            };

            if let Some(frame) = frame {
                decoded += 1;
                if tx.send(frame).is_err() {
                    debug!(device = %device_id, "Frame reader released, decoder stopping");
                    return;
                }
            }
        }

        if decoded == 0 {
            warn!(device = %device_id, "No decodable images, stopping stream");
            return;
        }
    }
}

struct FrameDirectorySource {
    device_id: String,
    frames: Option<Receiver<Frame>>,
    in_use: InUse,
}

impl FrameSource for FrameDirectorySource {
    fn read_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        let Some(frames) = self.frames.as_ref() else {
            return Ok(None);
        };

        match frames.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(CameraError::NoCameraAvailable),
        }
    }

    fn release(&mut self) {
        // Dropping the receiver stops the decoder thread
        self.frames = None;
        self.in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    fn frame_dir(shades: &[u8]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (i, shade) in shades.iter().enumerate() {
            GrayImage::from_pixel(4, 3, Luma([*shade]))
                .save(dir.path().join(format!("frame_{:02}.png", i)))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
        dir
    }

    /// Wait for the decoder thread to deliver the next frame
    fn next_frame(source: &mut Box<dyn FrameSource>) -> Result<Frame, CameraError> {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            if let Some(frame) = source.read_frame()? {
                return Ok(frame);
            }
            assert!(std::time::Instant::now() < deadline, "no frame decoded in time");
            thread::sleep(std::time::Duration::from_millis(2));
        }
    }

    fn device(id: &str, facing: Option<Facing>, frames: &Path) -> FrameDirectoryDevice {
        FrameDirectoryDevice {
            id: id.to_string(),
            label: format!("{} camera", id),
            facing,
            frames: frames.to_path_buf(),
        }
    }

    #[test]
    fn test_frames_replay_in_order_and_loop() {
        let dir = frame_dir(&[10, 20]);
        let backend = FrameDirectoryBackend::new(vec![device("rear", Some(Facing::Environment), dir.path())]);

        let mut stream = backend
            .open_stream(&DeviceSelector::Facing(Facing::Environment))
            .unwrap();
        assert_eq!(stream.device.id, "rear");

        let shades: Vec<u8> = (0..3)
            .map(|_| next_frame(&mut stream.source).unwrap().pixel(0, 0))
            .collect();
        assert_eq!(shades, vec![10, 20, 10]);

        let frame = next_frame(&mut stream.source).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
    }

    #[test]
    fn test_undecodable_directory_loses_stream() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.png"), "not really a png").unwrap();
        let backend = FrameDirectoryBackend::new(vec![device("rear", Some(Facing::Environment), dir.path())]);

        let mut stream = backend
            .open_stream(&DeviceSelector::Facing(Facing::Environment))
            .unwrap();

        assert_eq!(
            next_frame(&mut stream.source).unwrap_err(),
            CameraError::NoCameraAvailable
        );
    }

    #[test]
    fn test_released_source_yields_nothing() {
        let dir = frame_dir(&[0]);
        let backend = FrameDirectoryBackend::new(vec![device("rear", Some(Facing::Environment), dir.path())]);
        let mut stream = backend
            .open_stream(&DeviceSelector::Facing(Facing::Environment))
            .unwrap();

        stream.source.release();
        assert_eq!(stream.source.read_frame(), Ok(None));
    }

    #[test]
    fn test_file_instead_of_directory_is_no_camera() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("frames.png");
        std::fs::write(&file, "x").unwrap();
        let backend = FrameDirectoryBackend::new(vec![device("rear", Some(Facing::Environment), &file)]);

        assert!(matches!(
            backend.open_stream(&DeviceSelector::Facing(Facing::Environment)),
            Err(CameraError::NoCameraAvailable)
        ));
    }

    #[test]
    fn test_second_open_is_busy_until_release() {
        let dir = frame_dir(&[0]);
        let backend = FrameDirectoryBackend::new(vec![device("front", Some(Facing::User), dir.path())]);
        let selector = DeviceSelector::DeviceId("front".to_string());

        let mut first = backend.open_stream(&selector).unwrap();
        assert!(matches!(
            backend.open_stream(&selector),
            Err(CameraError::DeviceBusy(_))
        ));

        first.source.release();
        assert!(backend.open_stream(&selector).is_ok());
    }

    #[test]
    fn test_unmatched_selector_and_missing_dir() {
        let backend = FrameDirectoryBackend::new(vec![device(
            "rear",
            Some(Facing::Environment),
            Path::new("/nonexistent/feria/frames"),
        )]);

        assert!(matches!(
            backend.open_stream(&DeviceSelector::Facing(Facing::User)),
            Err(CameraError::NoCameraAvailable)
        ));
        assert!(matches!(
            backend.open_stream(&DeviceSelector::Facing(Facing::Environment)),
            Err(CameraError::NoCameraAvailable)
        ));
    }

    #[test]
    fn test_devices_lists_configuration() {
        let backend = FrameDirectoryBackend::new(vec![
            device("rear", Some(Facing::Environment), Path::new("/a")),
            device("usb", None, Path::new("/b")),
        ]);

        let devices = backend.devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].id, "usb");
        assert_eq!(devices[1].facing, None);
    }
}
