#![doc = include_str!("../README.md")]

mod error;

pub mod bits;
pub mod config;
pub mod encoder;
pub mod framing;
pub mod harness;
pub mod modulation;
pub mod nmea;
pub mod nrzi;
pub mod radio;
pub mod report;

mod prelude {
    pub use crate::error::{Error, Result};
}

pub use bits::{read_recovered_bits, BitOrder};
pub use config::{Config, ModemConfig};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use framing::{DecodedFrame, Decoder};
pub use modulation::{WakeTone, Waveform};
pub use radio::{RadioConfig, RadioSink, Transmitter};
pub use report::Report;
