//! GMSK waveform synthesis.
mod burst;
mod gmsk;

pub use burst::*;
pub use gmsk::*;

use num_complex::{Complex, Complex64};

/// Complex baseband samples at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub sample_rate: f64,
    pub samples: Vec<Complex64>,
}

impl Waveform {
    #[must_use]
    pub fn new(sample_rate: f64, samples: Vec<Complex64>) -> Self {
        Waveform {
            sample_rate,
            samples,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Peak sample magnitude.
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.samples.iter().map(|s| s.norm()).fold(0.0, f64::max)
    }

    /// Round to signed 16-bit I/Q, saturating at the type limits.
    #[must_use]
    pub fn to_cs16(&self) -> Vec<Complex<i16>> {
        self.samples
            .iter()
            .map(|s| Complex::new(saturate(s.re), saturate(s.im)))
            .collect()
    }

    /// Interleaved little-endian I/Q bytes as consumed by most SDR front ends.
    #[must_use]
    pub fn to_cs16_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 4);
        for s in self.to_cs16() {
            out.extend_from_slice(&s.re.to_le_bytes());
            out.extend_from_slice(&s.im.to_le_bytes());
        }
        out
    }
}

fn saturate(x: f64) -> i16 {
    // float to int casts saturate
    x.round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cs16_rounds_and_saturates() {
        let wf = Waveform::new(
            1.0,
            vec![Complex64::new(1.4, -1.6), Complex64::new(40_000.0, -40_000.0)],
        );
        assert_eq!(
            wf.to_cs16(),
            vec![Complex::new(1, -2), Complex::new(i16::MAX, i16::MIN)]
        );
    }

    #[test]
    fn cs16_bytes_are_interleaved_le() {
        let wf = Waveform::new(1.0, vec![Complex64::new(1.0, -2.0)]);
        assert_eq!(wf.to_cs16_bytes(), vec![0x01, 0x00, 0xfe, 0xff]);
    }

    #[test]
    fn duration() {
        let wf = Waveform::new(1000.0, vec![Complex64::default(); 250]);
        assert!((wf.duration() - 0.25).abs() < 1e-12);
        assert_eq!(wf.len(), 250);
        assert_eq!(wf.peak(), 0.0);
    }
}
