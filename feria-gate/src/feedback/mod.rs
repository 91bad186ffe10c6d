//! Audible feedback for validation outcomes
//!
//! Every completed validation produces one short cue:
//!
//! | Cue        | Pattern                                                 |
//! |------------|---------------------------------------------------------|
//! | `Accepted` | one 800 Hz sine tone, 200 ms, gain 0.3                  |
//! | `Rejected` | three 300 Hz square bursts, 300 ms each, every 400 ms   |
//! | `Alert`    | same as `Rejected` at gain 0.5                          |
//!
//! Playback is fire-and-forget: a [`FeedbackSink`] never blocks the caller
//! and never reports failure.

pub mod tone;

pub use tone::ToneFeedback;

use feria_common::ValidationOutcome;
use std::f32::consts::TAU;
use std::time::Duration;

/// Which cue an outcome maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackCue {
    Accepted,
    Rejected,
    Alert,
}

impl FeedbackCue {
    pub fn for_outcome(outcome: &ValidationOutcome) -> Self {
        if outcome.valid() {
            FeedbackCue::Accepted
        } else if outcome.alert() {
            FeedbackCue::Alert
        } else {
            FeedbackCue::Rejected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
}

/// One tone inside a cue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneBurst {
    pub frequency_hz: f32,
    pub waveform: Waveform,
    /// Offset from the start of the cue
    pub start: Duration,
    pub duration: Duration,
    pub gain: f32,
}

impl ToneBurst {
    fn end(&self) -> Duration {
        self.start + self.duration
    }

    fn sample_at(&self, t: f32) -> f32 {
        let start = self.start.as_secs_f32();
        if t < start || t >= self.end().as_secs_f32() {
            return 0.0;
        }

        let phase = (t - start) * self.frequency_hz;
        let value = match self.waveform {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase.fract() < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        value * self.gain
    }
}

const ACCEPTED_HZ: f32 = 800.0;
const REJECTED_HZ: f32 = 300.0;
const ACCEPTED_MS: u64 = 200;
const REJECTED_BURST_MS: u64 = 300;
const REJECTED_SPACING_MS: u64 = 400;
const REJECTED_BURSTS: u64 = 3;
const NORMAL_GAIN: f32 = 0.3;
const ALERT_GAIN: f32 = 0.5;

/// Renderable form of a cue
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSequence {
    bursts: Vec<ToneBurst>,
}

impl ToneSequence {
    /// Build the tones for `cue`, with gains scaled by `volume` (0.0 - 1.0)
    pub fn for_cue(cue: FeedbackCue, volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);

        let bursts = match cue {
            FeedbackCue::Accepted => vec![ToneBurst {
                frequency_hz: ACCEPTED_HZ,
                waveform: Waveform::Sine,
                start: Duration::ZERO,
                duration: Duration::from_millis(ACCEPTED_MS),
                gain: NORMAL_GAIN * volume,
            }],
            FeedbackCue::Rejected | FeedbackCue::Alert => {
                let gain = if cue == FeedbackCue::Alert {
                    ALERT_GAIN
                } else {
                    NORMAL_GAIN
                };
                (0..REJECTED_BURSTS)
                    .map(|i| ToneBurst {
                        frequency_hz: REJECTED_HZ,
                        waveform: Waveform::Square,
                        start: Duration::from_millis(i * REJECTED_SPACING_MS),
                        duration: Duration::from_millis(REJECTED_BURST_MS),
                        gain: gain * volume,
                    })
                    .collect()
            }
        };

        Self { bursts }
    }

    pub fn bursts(&self) -> &[ToneBurst] {
        &self.bursts
    }

    /// Time until the last burst ends
    pub fn total_duration(&self) -> Duration {
        self.bursts
            .iter()
            .map(ToneBurst::end)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Mono sample at `t` seconds from the start of the cue
    pub fn sample_at(&self, t: f32) -> f32 {
        self.bursts.iter().map(|b| b.sample_at(t)).sum()
    }
}

/// Plays feedback for an outcome
pub trait FeedbackSink: Send + Sync {
    /// Start playback and return immediately; failures are logged, not returned
    fn play(&self, outcome: &ValidationOutcome);
}

/// Sink that plays nothing (`--no-audio`, headless stations)
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentFeedback;

impl FeedbackSink for SilentFeedback {
    fn play(&self, outcome: &ValidationOutcome) {
        tracing::debug!(cue = ?FeedbackCue::for_outcome(outcome), "Audio feedback disabled");
    }
}
