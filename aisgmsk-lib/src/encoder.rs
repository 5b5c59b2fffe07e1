use tracing::{debug, span, Level};

use crate::config::ModemConfig;
use crate::framing::frame;
use crate::modulation::{Burst, GmskModulator, Waveform};
use crate::prelude::*;
use crate::{nrzi, Report};

/// Turns reports into line levels and transmit-ready waveforms.
///
/// Encoding is deterministic: the same report and config always produce the same samples.
#[derive(Debug, Clone)]
pub struct Encoder {
    config: ModemConfig,
    modulator: GmskModulator,
}

impl Encoder {
    /// # Errors
    /// [Error::Config] if `config` does not validate.
    pub fn new(config: ModemConfig) -> Result<Self> {
        config.validate()?;
        let modulator = GmskModulator::new(
            config.bt,
            config.samples_per_symbol(),
            config.modulation_index,
            config.amplitude,
        )?;
        Ok(Encoder { config, modulator })
    }

    #[must_use]
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// The 168 payload bits.
    #[must_use]
    pub fn payload(&self, report: &Report) -> Vec<bool> {
        report.encode(self.config.bit_order)
    }

    /// Logical bits of the complete frame, preamble through closing flag.
    #[must_use]
    pub fn frame_bits(&self, report: &Report) -> Vec<bool> {
        frame(&self.payload(report), self.config.preamble_length)
    }

    /// NRZI line levels for the frame.
    #[must_use]
    pub fn levels(&self, report: &Report) -> Vec<bool> {
        nrzi::encode(&self.frame_bits(report))
    }

    /// A single modulated frame with no tone, gaps or padding.
    #[must_use]
    pub fn modulate(&self, report: &Report) -> Waveform {
        Waveform::new(
            self.config.sample_rate,
            self.modulator.modulate(&self.levels(report)),
        )
    }

    /// The full transmit burst described by the config.
    #[must_use]
    pub fn waveform(&self, report: &Report) -> Waveform {
        let span = span!(Level::DEBUG, "encode", mmsi = report.mmsi);
        let _guard = span.enter();

        let frame = self.modulate(report);
        let mut burst = Burst::new()
            .with_repeat(self.config.repeat)
            .with_gap(self.config.gap_samples());
        if let Some(tone) = &self.config.wake_tone {
            burst = burst.with_tone(tone.render(self.config.sample_rate, self.config.amplitude));
        }
        if let Some(len) = self.config.buffer_length {
            burst = burst.with_buffer_length(len);
        }

        let samples = burst.compose(&frame.samples);
        debug!(
            frame = frame.len(),
            samples = samples.len(),
            "composed burst"
        );
        Waveform::new(self.config.sample_rate, samples)
    }
}
