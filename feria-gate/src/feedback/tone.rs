//! Tone playback on the default audio output device
//!
//! Each cue gets its own short-lived output stream on a dedicated thread, so
//! `play` returns immediately and a missing or broken audio device never
//! reaches the scan session.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use feria_common::ValidationOutcome;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{FeedbackCue, FeedbackSink, ToneSequence};
use crate::error::{Error, Result};

/// Extra time the stream stays alive after the last burst
const STREAM_TAIL: Duration = Duration::from_millis(100);

/// Sink that synthesizes cues with `cpal`
#[derive(Debug, Clone, Copy)]
pub struct ToneFeedback {
    volume: f32,
}

impl ToneFeedback {
    /// `volume` is the master gain, clamped to 0.0 - 1.0
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl Default for ToneFeedback {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FeedbackSink for ToneFeedback {
    fn play(&self, outcome: &ValidationOutcome) {
        let cue = FeedbackCue::for_outcome(outcome);
        let sequence = ToneSequence::for_cue(cue, self.volume);
        debug!(cue = ?cue, "Playing feedback cue");

        let spawned = std::thread::Builder::new()
            .name("feria-feedback".to_string())
            .spawn(move || {
                if let Err(e) = render(sequence) {
                    warn!(cue = ?cue, "Feedback cue not played: {}", e);
                }
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn feedback thread: {}", e);
        }
    }
}

/// Play `sequence` to completion on the default output device (blocking)
fn render(sequence: ToneSequence) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config = supported.config();
    let duration = sequence.total_duration();

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, sequence)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, sequence)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, sequence)?,
        sample_format => {
            return Err(Error::AudioOutput(format!(
                "Unsupported sample format: {:?}",
                sample_format
            )));
        }
    };

    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

    std::thread::sleep(duration + STREAM_TAIL);
    drop(stream);
    Ok(())
}

fn build_stream<T>(device: &Device, config: &StreamConfig, sequence: ToneSequence) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let sample_rate = config.sample_rate.0 as f32;
    let mut frame_index: u64 = 0;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let t = frame_index as f32 / sample_rate;
                    frame_index += 1;

                    let value = T::from_sample(sequence.sample_at(t).clamp(-1.0, 1.0));
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                }
            },
            move |err| {
                error!("Feedback stream error: {}", err);
            },
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}
