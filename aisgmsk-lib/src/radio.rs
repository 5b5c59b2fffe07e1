//! Transmit side radio abstraction.
//!
//! A [RadioSink] is anything that can accept a buffer of 16-bit I/Q samples. The [Transmitter]
//! owns a sink and makes sure at most one transmit buffer is loaded at a time.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use num_complex::Complex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::prelude::*;

/// Front end settings applied when a [Transmitter] is opened.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RadioConfig {
    /// Samples per second.
    pub sample_rate: f64,
    /// Hz
    pub center_frequency: f64,
    /// Transmit gain in dB.
    pub gain: f64,
    /// Hz
    pub rf_bandwidth: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        RadioConfig {
            sample_rate: 2_000_000.0,
            // ISM bench frequency
            center_frequency: 433_605_000.0,
            gain: -10.0,
            rf_bandwidth: 200_000.0,
        }
    }
}

/// A device, or stand-in for one, that transmits sample buffers.
pub trait RadioSink: Send {
    fn name(&self) -> &str;

    /// # Errors
    /// [Error::Radio] if the settings are rejected.
    fn configure(&mut self, config: &RadioConfig) -> Result<()>;

    /// Load and start transmitting `samples`. A cyclic buffer repeats until released.
    ///
    /// # Errors
    /// [Error::Radio] or [Error::Io] if the buffer could not be loaded.
    fn transmit(&mut self, samples: &[Complex<i16>], cyclic: bool) -> Result<()>;

    /// Tear down the current transmit buffer, if any.
    ///
    /// # Errors
    /// [Error::Radio] or [Error::Io] if the buffer could not be released.
    fn release(&mut self) -> Result<()>;
}

/// Exclusive handle to a configured [RadioSink].
///
/// The previous buffer is released before a new one is loaded, and the last buffer is released
/// on [Transmitter::close] or drop.
pub struct Transmitter {
    sink: Box<dyn RadioSink>,
    loaded: bool,
    sent: usize,
}

impl Transmitter {
    /// Configure `sink` and take ownership of it.
    ///
    /// # Errors
    /// Any error from [RadioSink::configure].
    pub fn open(mut sink: Box<dyn RadioSink>, config: &RadioConfig) -> Result<Self> {
        sink.configure(config)?;
        info!(
            sink = sink.name(),
            frequency = config.center_frequency,
            sample_rate = config.sample_rate,
            "radio configured"
        );
        Ok(Transmitter {
            sink,
            loaded: false,
            sent: 0,
        })
    }

    /// Transmit a single buffer.
    ///
    /// # Errors
    /// Any error from [RadioSink::release] or [RadioSink::transmit].
    pub fn send(&mut self, samples: &[Complex<i16>]) -> Result<()> {
        self.load(samples, false)
    }

    /// Transmit a buffer that repeats until the next send or close.
    ///
    /// # Errors
    /// Any error from [RadioSink::release] or [RadioSink::transmit].
    pub fn send_cyclic(&mut self, samples: &[Complex<i16>]) -> Result<()> {
        self.load(samples, true)
    }

    fn load(&mut self, samples: &[Complex<i16>], cyclic: bool) -> Result<()> {
        if self.loaded {
            self.sink.release()?;
            self.loaded = false;
        }
        self.sink.transmit(samples, cyclic)?;
        self.loaded = true;
        self.sent += 1;
        debug!(
            samples = samples.len(),
            cyclic,
            sent = self.sent,
            "buffer transmitted"
        );
        Ok(())
    }

    /// Number of buffers sent so far.
    #[must_use]
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Release the last buffer.
    ///
    /// # Errors
    /// Any error from [RadioSink::release].
    pub fn close(mut self) -> Result<()> {
        if self.loaded {
            self.loaded = false;
            self.sink.release()?;
        }
        Ok(())
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        if self.loaded {
            self.loaded = false;
            if let Err(err) = self.sink.release() {
                warn!("failed to release radio buffer: {err}");
            }
        }
    }
}

/// Appends every transmitted buffer to a file as interleaved little-endian i16 I/Q ("cs16").
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// # Errors
    /// [Error::Io] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(File::create(&path)?);
        Ok(FileSink { path, writer })
    }
}

impl RadioSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn configure(&mut self, config: &RadioConfig) -> Result<()> {
        debug!(path = ?self.path, ?config, "file sink ignores radio settings");
        Ok(())
    }

    fn transmit(&mut self, samples: &[Complex<i16>], cyclic: bool) -> Result<()> {
        if cyclic {
            debug!("cyclic transmit written once to file");
        }
        for s in samples {
            self.writer.write_all(&s.re.to_le_bytes())?;
            self.writer.write_all(&s.im.to_le_bytes())?;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every transmitted buffer in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub config: Option<RadioConfig>,
    pub buffers: Vec<Vec<Complex<i16>>>,
    /// Number of release calls.
    pub releases: usize,
    /// Buffers currently loaded and not yet released.
    pub loaded: usize,
    /// Whether the last buffer was loaded cyclic.
    pub cyclic: bool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RadioSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn configure(&mut self, config: &RadioConfig) -> Result<()> {
        if !(config.sample_rate > 0.0) {
            return Err(Error::Radio(format!(
                "invalid sample rate {}",
                config.sample_rate
            )));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn transmit(&mut self, samples: &[Complex<i16>], cyclic: bool) -> Result<()> {
        if self.loaded > 0 {
            return Err(Error::Radio("buffer already loaded".to_string()));
        }
        self.buffers.push(samples.to_vec());
        self.cyclic = cyclic;
        self.loaded += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.releases += 1;
        self.loaded = 0;
        Ok(())
    }
}

/// A sink shared with the caller so tests can inspect it after handing it to a [Transmitter].
impl<S: RadioSink> RadioSink for std::sync::Arc<std::sync::Mutex<S>> {
    fn name(&self) -> &str {
        "shared"
    }

    fn configure(&mut self, config: &RadioConfig) -> Result<()> {
        lock(self)?.configure(config)
    }

    fn transmit(&mut self, samples: &[Complex<i16>], cyclic: bool) -> Result<()> {
        lock(self)?.transmit(samples, cyclic)
    }

    fn release(&mut self) -> Result<()> {
        lock(self)?.release()
    }
}

fn lock<S>(sink: &std::sync::Mutex<S>) -> Result<std::sync::MutexGuard<'_, S>> {
    sink.lock()
        .map_err(|_| Error::Radio("sink lock poisoned".to_string()))
}
