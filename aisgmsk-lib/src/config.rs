use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::bits::BitOrder;
use crate::framing::DEFAULT_PREAMBLE_LEN;
use crate::modulation::WakeTone;
use crate::prelude::*;
use crate::radio::RadioConfig;

/// Largest amplitude that survives conversion to signed 16-bit samples.
pub const MAX_AMPLITUDE: f64 = i16::MAX as f64;

/// Everything needed to turn a report into a transmit buffer.
///
/// # Examples
/// ```
/// use aisgmsk::ModemConfig;
///
/// let config = ModemConfig::builder()
///     .bt(0.3)
///     .repeat(3)
///     .gap(0.05)
///     .build();
/// assert_eq!(config.samples_per_symbol(), 208);
/// config.validate().unwrap();
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TypedBuilder)]
#[serde(default)]
pub struct ModemConfig {
    /// Gaussian filter bandwidth-time product.
    #[builder(default = 0.4)]
    pub bt: f64,
    #[builder(default = 0.5)]
    pub modulation_index: f64,
    /// Symbols per second.
    #[builder(default = 9600.0)]
    pub baud_rate: f64,
    /// Samples per second.
    #[builder(default = 2_000_000.0)]
    pub sample_rate: f64,
    #[builder(default)]
    pub bit_order: BitOrder,
    /// Preamble bits ahead of the opening flag.
    #[builder(default = DEFAULT_PREAMBLE_LEN)]
    pub preamble_length: usize,
    /// Peak sample magnitude.
    #[builder(default = 16384.0)]
    pub amplitude: f64,
    #[builder(default, setter(strip_option))]
    pub wake_tone: Option<WakeTone>,
    /// Copies of the frame in one burst.
    #[builder(default = 1)]
    pub repeat: usize,
    /// Silence after each copy, in seconds.
    #[builder(default = 0.0)]
    pub gap: f64,
    /// Fixed burst length in samples.
    #[builder(default, setter(strip_option))]
    pub buffer_length: Option<usize>,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ModemConfig {
    /// Whole samples per symbol, `floor(sample_rate / baud_rate)`.
    #[must_use]
    pub fn samples_per_symbol(&self) -> usize {
        if self.baud_rate <= 0.0 || self.sample_rate <= 0.0 {
            return 0;
        }
        (self.sample_rate / self.baud_rate).floor() as usize
    }

    /// Gap length in samples.
    #[must_use]
    pub fn gap_samples(&self) -> usize {
        (self.gap * self.sample_rate).round().max(0.0) as usize
    }

    /// # Errors
    /// [Error::Config] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(self.bt > 0.0) {
            return Err(Error::Config(format!("bt must be positive, got {}", self.bt)));
        }
        if !(self.modulation_index > 0.0) {
            return Err(Error::Config(format!(
                "modulation_index must be positive, got {}",
                self.modulation_index
            )));
        }
        if !(self.baud_rate > 0.0) || !(self.sample_rate > 0.0) {
            return Err(Error::Config(format!(
                "rates must be positive, got baud_rate={} sample_rate={}",
                self.baud_rate, self.sample_rate
            )));
        }
        if self.samples_per_symbol() < 2 {
            return Err(Error::Config(format!(
                "sample_rate {} gives fewer than 2 samples per symbol at {} baud",
                self.sample_rate, self.baud_rate
            )));
        }
        if !(self.amplitude > 0.0 && self.amplitude <= MAX_AMPLITUDE) {
            return Err(Error::Config(format!(
                "amplitude must be in (0, {MAX_AMPLITUDE}], got {}",
                self.amplitude
            )));
        }
        if !(self.gap >= 0.0) {
            return Err(Error::Config(format!("gap must not be negative, got {}", self.gap)));
        }
        if let Some(tone) = &self.wake_tone {
            if !(tone.duration >= 0.0 && tone.duration.is_finite()) || !tone.frequency.is_finite()
            {
                return Err(Error::Config(format!("invalid wake tone {tone:?}")));
            }
            if !(tone.amplitude >= 0.0 && tone.amplitude * self.amplitude <= MAX_AMPLITUDE) {
                return Err(Error::Config(format!(
                    "wake tone amplitude {} times amplitude {} exceeds {MAX_AMPLITUDE}",
                    tone.amplitude, self.amplitude
                )));
            }
            if let Some(limit) = self.buffer_length {
                let len = tone.samples(self.sample_rate);
                if len >= limit {
                    return Err(Error::Config(format!(
                        "wake tone of {len} samples leaves no room in a buffer of {limit}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Modem and radio settings as read from a JSON file. Missing sections and fields take their
/// defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub modem: ModemConfig,
    pub radio: RadioConfig,
}

impl Config {
    /// Read and validate a config.
    ///
    /// # Errors
    /// [Error::ConfigFormat] if the JSON is malformed, [Error::Config] if it is not valid.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the modem settings and check the radio runs at the rate the waveform is
    /// synthesized for.
    ///
    /// # Errors
    /// [Error::Config] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.modem.validate()?;
        if self.radio.sample_rate != self.modem.sample_rate {
            return Err(Error::Config(format!(
                "radio sample_rate {} does not match modem sample_rate {}",
                self.radio.sample_rate, self.modem.sample_rate
            )));
        }
        Ok(())
    }

    /// # Errors
    /// See [Config::from_reader]. [Error::Io] if the file cannot be opened.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}
