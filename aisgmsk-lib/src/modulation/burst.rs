use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A constant-frequency tone sent ahead of the frames to settle the receiver's AGC.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct WakeTone {
    /// Tone offset from the carrier in Hz.
    pub frequency: f64,
    /// Seconds.
    pub duration: f64,
    /// Amplitude relative to the frame amplitude.
    pub amplitude: f64,
}

impl Default for WakeTone {
    fn default() -> Self {
        WakeTone {
            frequency: 2400.0,
            duration: 0.020,
            amplitude: 0.5,
        }
    }
}

impl WakeTone {
    /// Tone length in samples at `sample_rate`.
    #[must_use]
    pub fn samples(&self, sample_rate: f64) -> usize {
        (self.duration * sample_rate).round().max(0.0) as usize
    }

    /// Render the tone at `sample_rate`, scaled by the frame amplitude `scale`.
    #[must_use]
    pub fn render(&self, sample_rate: f64, scale: f64) -> Vec<Complex64> {
        let len = self.samples(sample_rate);
        let step = 2.0 * PI * self.frequency / sample_rate;
        let magnitude = self.amplitude * scale;
        (0..len)
            .map(|n| Complex64::from_polar(magnitude, step * n as f64))
            .collect()
    }
}

/// Lays out a transmission buffer: optional wake tone, then `repeat` copies of a frame each
/// followed by a silent gap.
#[derive(Debug, Clone, Default)]
pub struct Burst {
    tone: Vec<Complex64>,
    repeat: usize,
    gap: usize,
    buffer_length: Option<usize>,
}

impl Burst {
    #[must_use]
    pub fn new() -> Self {
        Burst {
            repeat: 1,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_tone(mut self, tone: Vec<Complex64>) -> Self {
        self.tone = tone;
        self
    }

    #[must_use]
    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }

    /// Silence after each frame copy, in samples.
    #[must_use]
    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    /// Fixed output length. Shorter bursts are zero padded, longer ones lose whole repetitions
    /// from the end.
    #[must_use]
    pub fn with_buffer_length(mut self, len: usize) -> Self {
        self.buffer_length = Some(len);
        self
    }

    /// Number of frame copies that fit given the configured buffer length.
    #[must_use]
    pub fn repetitions_that_fit(&self, frame_len: usize) -> usize {
        let Some(limit) = self.buffer_length else {
            return self.repeat;
        };
        let mut used = self.tone.len();
        let mut count = 0;
        while count < self.repeat && used + frame_len <= limit {
            used += frame_len + self.gap;
            count += 1;
        }
        count
    }

    #[must_use]
    pub fn compose(&self, frame: &[Complex64]) -> Vec<Complex64> {
        let reps = self.repetitions_that_fit(frame.len());
        if reps < self.repeat {
            debug!(
                requested = self.repeat,
                fitted = reps,
                "dropping repetitions that exceed the buffer"
            );
        }

        let mut out = Vec::with_capacity(
            self.buffer_length
                .unwrap_or(self.tone.len() + self.repeat * (frame.len() + self.gap)),
        );
        out.extend_from_slice(&self.tone);
        for _ in 0..reps {
            out.extend_from_slice(frame);
            out.resize(out.len() + self.gap, Complex64::default());
        }

        if let Some(limit) = self.buffer_length {
            if reps == 0 && self.repeat > 0 {
                if self.tone.len() >= limit {
                    warn!(
                        tone = self.tone.len(),
                        buffer = limit,
                        "wake tone fills the buffer, frame not sent"
                    );
                } else {
                    warn!(
                        frame = frame.len(),
                        buffer = limit,
                        "frame does not fit the buffer, truncating"
                    );
                    out.extend_from_slice(frame);
                }
            }
            out.resize(limit, Complex64::default());
        }
        out
    }
}
