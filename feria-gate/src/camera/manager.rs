//! Camera acquisition manager
//!
//! Owns the single open camera stream. Opening follows a fixed cascade:
//!
//! 1. Stream with the preferred facing (rear/environment by default)
//! 2. Stream with the opposite facing
//! 3. Enumerate devices and open the first one by id
//! 4. No devices: `NoCameraAvailable`
//!
//! Failures of intermediate attempts are logged and swallowed; only the last
//! failure is returned to the caller.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{CameraBackend, CameraDevice, CameraError, DeviceSelector, Facing, Frame, FrameSource};

/// An open camera stream
///
/// Created by [`CameraManager::open`]. `close` is idempotent and also runs on
/// drop, so the device is released on every exit path.
pub struct CameraHandle {
    selector: DeviceSelector,
    device: CameraDevice,
    source: Box<dyn FrameSource>,
    open: bool,
}

impl CameraHandle {
    fn new(selector: DeviceSelector, device: CameraDevice, source: Box<dyn FrameSource>) -> Self {
        Self {
            selector,
            device,
            source,
            open: true,
        }
    }

    /// Selector that produced this stream
    pub fn selector(&self) -> &DeviceSelector {
        &self.selector
    }

    /// Device actually opened
    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Pull the next frame; a closed handle never yields frames
    pub fn read_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        if !self.open {
            return Ok(None);
        }
        self.source.read_frame()
    }

    /// Release the device; safe to call any number of times
    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            self.source.release();
            debug!(device = %self.device.id, "Camera stream released");
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("selector", &self.selector)
            .field("device", &self.device)
            .field("open", &self.open)
            .finish()
    }
}

/// Sole owner of the camera resource
pub struct CameraManager {
    backend: Arc<dyn CameraBackend>,
    handle: Option<CameraHandle>,
}

impl CameraManager {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            handle: None,
        }
    }

    /// Open a stream, closing any stream that is already open
    ///
    /// # Errors
    /// The failure of the last cascade step: the enumeration error, the error
    /// opening the first enumerated device, or `NoCameraAvailable`.
    pub fn open(&mut self, preferred: Facing) -> Result<&mut CameraHandle, CameraError> {
        self.close();

        let handle = self.acquire(preferred)?;
        info!(
            device = %handle.device.id,
            label = %handle.device.label,
            selector = %handle.selector,
            "Camera stream opened"
        );
        Ok(self.handle.insert(handle))
    }

    fn acquire(&self, preferred: Facing) -> Result<CameraHandle, CameraError> {
        for facing in [preferred, preferred.opposite()] {
            let selector = DeviceSelector::Facing(facing);
            match self.open_with(selector) {
                Ok(handle) => return Ok(handle),
                Err(e) => warn!(facing = %facing, "Camera request failed, trying next option: {}", e),
            }
        }

        let devices = self.backend.devices()?;
        debug!("Enumerated {} camera devices", devices.len());

        let first = devices
            .into_iter()
            .next()
            .ok_or(CameraError::NoCameraAvailable)?;
        self.open_with(DeviceSelector::DeviceId(first.id))
    }

    fn open_with(&self, selector: DeviceSelector) -> Result<CameraHandle, CameraError> {
        let opened = self.backend.open_stream(&selector)?;
        Ok(CameraHandle::new(selector, opened.device, opened.source))
    }

    /// Close the open stream, if any
    ///
    /// Returns whether a stream was actually released. Never fails.
    pub fn close(&mut self) -> bool {
        match self.handle.take() {
            Some(mut handle) => {
                handle.close();
                info!(device = %handle.device.id, "Camera stream closed");
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(CameraHandle::is_open)
    }

    pub fn handle_mut(&mut self) -> Option<&mut CameraHandle> {
        self.handle.as_mut()
    }

    /// Device of the open stream
    pub fn active_device(&self) -> Option<&CameraDevice> {
        self.handle.as_ref().map(CameraHandle::device)
    }

    /// Enumerate devices through the backend
    pub fn devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        self.backend.devices()
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.close();
    }
}
