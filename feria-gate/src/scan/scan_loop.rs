//! Frame sampling loop
//!
//! Samples the open camera at `fps` and reports the first decoded code. The
//! loop stops itself before reporting a detection, so one physical code
//! presentation produces exactly one detection even if the code stays in
//! frame during the validation round trip.
//!
//! Frames without a code and ambiguous frames are expected steady-state
//! behaviour and are not reported.

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::{CodeDecoder, DecodeAttempt, ScanLoopConfig};
use crate::camera::{CameraError, CameraHandle, CameraManager};

/// What the scan loop reports to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanLoopEvent {
    /// A code was decoded; the loop has already stopped
    Detected(String),
    /// The frame source failed; the loop has already stopped
    StreamFailed(CameraError),
}

/// Fixed-rate frame sampler
pub struct ScanLoop {
    decoder: Box<dyn CodeDecoder>,
    config: ScanLoopConfig,
    ticker: Option<Interval>,
    running: bool,
    frames_sampled: u64,
}

impl ScanLoop {
    pub fn new(decoder: Box<dyn CodeDecoder>, config: ScanLoopConfig) -> Self {
        Self {
            decoder,
            config,
            ticker: None,
            running: false,
            frames_sampled: 0,
        }
    }

    /// Begin sampling; the ticker is created lazily on the first await
    pub fn start(&mut self) {
        self.running = true;
        self.ticker = None;
        self.frames_sampled = 0;
        debug!(fps = self.config.fps, "Scan loop started");
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!(frames = self.frames_sampled, "Scan loop stopped");
        }
        self.running = false;
        self.ticker = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames decoded since the last `start`
    pub fn frames_sampled(&self) -> u64 {
        self.frames_sampled
    }

    pub fn config(&self) -> &ScanLoopConfig {
        &self.config
    }

    /// Run one sampling attempt against `handle`
    ///
    /// Returns `None` while no code is found. A stopped loop never samples.
    pub fn sample(&mut self, handle: &mut CameraHandle) -> Option<ScanLoopEvent> {
        if !self.running {
            return None;
        }

        let frame = match handle.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                warn!(device = %handle.device().id, "Camera stream failed while scanning: {}", e);
                self.stop();
                return Some(ScanLoopEvent::StreamFailed(e));
            }
        };

        self.frames_sampled += 1;
        let window = self.config.region.window_in(frame.width(), frame.height());

        match self.decoder.decode(&frame, window) {
            DecodeAttempt::Found(payload) => {
                self.stop();
                debug!(len = payload.len(), "Credential code detected");
                Some(ScanLoopEvent::Detected(payload))
            }
            DecodeAttempt::Ambiguous(count) => {
                trace!(count, "Several codes in scan window, ignoring frame");
                None
            }
            DecodeAttempt::NotFound => None,
        }
    }

    /// Sample at the configured rate until a code is found or the stream fails
    ///
    /// Never resolves while the loop is stopped. Cancel-safe: dropping the
    /// future between ticks loses nothing.
    pub async fn next_detection(&mut self, camera: &mut CameraManager) -> ScanLoopEvent {
        loop {
            if !self.running {
                std::future::pending::<()>().await;
            }

            let period = self.config.sample_interval();
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;

            match camera.handle_mut() {
                Some(handle) => {
                    if let Some(event) = self.sample(handle) {
                        return event;
                    }
                }
                None => {
                    warn!("Scan loop running without an open camera, stopping");
                    self.stop();
                }
            }
        }
    }
}
