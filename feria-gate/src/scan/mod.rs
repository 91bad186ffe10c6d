//! Credential code scanning
//!
//! The [`ScanLoop`] samples frames from the open camera at a fixed rate and
//! hands a centred window of each frame to a [`CodeDecoder`]. Restricting the
//! decode to the centre of the frame avoids picking up codes from background
//! clutter (posters, other attendees' phones).

pub mod qr;
pub mod scan_loop;

pub use qr::QrDecoder;
pub use scan_loop::{ScanLoop, ScanLoopEvent};

use serde::Deserialize;
use std::time::Duration;

use crate::camera::Frame;

/// Size of the centred decode window, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScanRegion {
    pub width: u32,
    pub height: u32,
}

impl Default for ScanRegion {
    fn default() -> Self {
        Self {
            width: 250,
            height: 250,
        }
    }
}

impl ScanRegion {
    /// Centre this region in a frame, clamping to the frame size
    pub fn window_in(&self, frame_width: u32, frame_height: u32) -> Window {
        let width = self.width.min(frame_width);
        let height = self.height.min(frame_height);
        Window {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        }
    }
}

/// A rectangle inside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Scan loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLoopConfig {
    /// Target samples per second
    pub fps: u32,
    pub region: ScanRegion,
}

impl Default for ScanLoopConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            region: ScanRegion::default(),
        }
    }
}

impl ScanLoopConfig {
    /// Time between samples; a zero fps is treated as 1
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }
}

/// Result of one decode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeAttempt {
    /// Exactly one code decoded
    Found(String),
    /// No code in the window
    NotFound,
    /// Several distinct codes in the window; keep scanning
    Ambiguous(usize),
}

/// Decodes a credential code from a frame window
pub trait CodeDecoder: Send {
    fn decode(&self, frame: &Frame, window: Window) -> DecodeAttempt;
}
