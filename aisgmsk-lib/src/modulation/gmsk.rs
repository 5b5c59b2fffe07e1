use std::f64::consts::PI;

use num_complex::Complex64;

use crate::prelude::*;

/// Kernel half-width in symbols.
pub const KERNEL_SPAN: usize = 4;

/// Unit-area Gaussian smoothing kernel with support `[-4·sps, 4·sps]`.
///
/// The standard deviation, in samples, is `sqrt(ln 2) / (2π·BT) · sps`.
#[must_use]
pub fn gaussian_kernel(bt: f64, sps: usize) -> Vec<f64> {
    let half = (KERNEL_SPAN * sps) as f64;
    let sigma = (2f64.ln().sqrt() / (2.0 * PI * bt)) * sps as f64;
    let len = 2 * KERNEL_SPAN * sps + 1;

    let mut kernel: Vec<f64> = (0..len)
        .map(|i| {
            let t = i as f64 - half;
            (-(t * t) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for tap in &mut kernel {
        *tap /= sum;
    }
    kernel
}

/// Gaussian minimum shift keying modulator.
///
/// Each line level becomes a ±1 symbol held for `sps` samples. The held signal is smoothed with
/// [gaussian_kernel] to give the instantaneous frequency, which is integrated into a phase
/// trajectory. Because the phase is a running sum it is continuous by construction, and every
/// output sample has magnitude `amplitude`.
#[derive(Debug, Clone)]
pub struct GmskModulator {
    sps: usize,
    modulation_index: f64,
    amplitude: f64,
    // cumulative[j] is the sum of the first j kernel taps
    cumulative: Vec<f64>,
}

impl GmskModulator {
    /// Create a new modulator.
    ///
    /// # Errors
    /// [Error::Config] if `bt` or `modulation_index` is not positive, or `sps` is less than 2.
    pub fn new(bt: f64, sps: usize, modulation_index: f64, amplitude: f64) -> Result<Self> {
        if bt.is_nan() || bt <= 0.0 {
            return Err(Error::Config(format!("BT must be positive, got {bt}")));
        }
        if modulation_index.is_nan() || modulation_index <= 0.0 {
            return Err(Error::Config(format!(
                "modulation index must be positive, got {modulation_index}"
            )));
        }
        if sps < 2 {
            return Err(Error::Config(format!(
                "need at least 2 samples per symbol, got {sps}"
            )));
        }

        let kernel = gaussian_kernel(bt, sps);
        let mut cumulative = Vec::with_capacity(kernel.len() + 1);
        let mut acc = 0.0;
        cumulative.push(acc);
        for tap in &kernel {
            acc += tap;
            cumulative.push(acc);
        }

        Ok(GmskModulator {
            sps,
            modulation_index,
            amplitude,
            cumulative,
        })
    }

    #[must_use]
    pub fn samples_per_symbol(&self) -> usize {
        self.sps
    }

    #[must_use]
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Smoothed instantaneous frequency, in symbol units, for each output sample.
    ///
    /// Equivalent to a 'same' convolution of the held symbol signal with the kernel. Since the
    /// held signal is constant across a symbol, each symbol's contribution is a difference of
    /// cumulative kernel sums.
    #[must_use]
    pub fn frequency(&self, levels: &[bool]) -> Vec<f64> {
        let sps = self.sps;
        let n = levels.len() * sps;
        let half = KERNEL_SPAN * sps;
        let last_tap = 2 * half;

        let mut freq = Vec::with_capacity(n);
        for i in 0..n {
            let first = i.saturating_sub(half) / sps;
            let last = ((i + half).min(n - 1)) / sps;
            let mut sum = 0.0;
            for (k, level) in levels.iter().enumerate().take(last + 1).skip(first) {
                // kernel taps i - u + half for u in this symbol's samples
                let hi = (i + half).saturating_sub(k * sps).min(last_tap);
                let Some(lo) = (i + half + 1).checked_sub((k + 1) * sps) else {
                    sum += symbol(*level) * self.cumulative[hi + 1];
                    continue;
                };
                if lo > hi {
                    continue;
                }
                sum += symbol(*level) * (self.cumulative[hi + 1] - self.cumulative[lo]);
            }
            freq.push(sum);
        }
        freq
    }

    /// Modulate line levels into complex baseband samples, `sps` samples per level.
    #[must_use]
    pub fn modulate(&self, levels: &[bool]) -> Vec<Complex64> {
        let scale = PI * self.modulation_index / self.sps as f64;
        let mut phase = 0.0;
        self.frequency(levels)
            .into_iter()
            .map(|f| {
                phase += f * scale;
                Complex64::from_polar(self.amplitude, phase)
            })
            .collect()
    }
}

fn symbol(level: bool) -> f64 {
    if level {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_convolution(levels: &[bool], kernel: &[f64], sps: usize) -> Vec<f64> {
        let up: Vec<f64> = levels
            .iter()
            .flat_map(|l| std::iter::repeat(symbol(*l)).take(sps))
            .collect();
        let half = (kernel.len() - 1) / 2;
        (0..up.len())
            .map(|i| {
                kernel
                    .iter()
                    .enumerate()
                    .filter_map(|(j, tap)| {
                        let u = (i + half).checked_sub(j)?;
                        up.get(u).map(|x| x * tap)
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(0.4, 8);
        assert_eq!(kernel.len(), 65);
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        for i in 0..kernel.len() / 2 {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-15);
        }
        let peak = kernel.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(peak, kernel[32]);
    }

    #[test]
    fn frequency_matches_direct_convolution() {
        let levels = vec![true, false, false, true, true, true, false, true, false, false];
        for sps in [2, 3, 8] {
            let m = GmskModulator::new(0.4, sps, 0.5, 1.0).unwrap();
            let expected = direct_convolution(&levels, &gaussian_kernel(0.4, sps), sps);
            let got = m.frequency(&levels);
            assert_eq!(got.len(), expected.len());
            for (i, (a, b)) in got.iter().zip(expected.iter()).enumerate() {
                assert!((a - b).abs() < 1e-9, "sps={sps} i={i}: {a} != {b}");
            }
        }
    }

    #[test]
    fn constant_envelope() {
        let m = GmskModulator::new(0.4, 16, 0.5, 16384.0).unwrap();
        let levels = vec![true, false, true, true, false, false, true, false];
        let samples = m.modulate(&levels);
        assert_eq!(samples.len(), levels.len() * 16);
        for (i, s) in samples.iter().enumerate() {
            assert!((s.norm() - 16384.0).abs() < 1e-6, "sample {i} magnitude {}", s.norm());
        }
    }

    #[test]
    fn steady_level_advances_quarter_cycle_per_symbol() {
        // With h = 0.5 a long run of one level shifts phase by pi/2 per symbol.
        let sps = 10;
        let m = GmskModulator::new(0.4, sps, 0.5, 1.0).unwrap();
        let levels = vec![true; 40];
        let samples = m.modulate(&levels);
        let a = samples[20 * sps];
        let b = samples[21 * sps];
        let dphi = (b * a.conj()).arg();
        assert!((dphi - PI / 2.0).abs() < 1e-6, "got {dphi}");
    }

    #[test]
    fn phase_is_continuous() {
        let sps = 8;
        let m = GmskModulator::new(0.3, sps, 0.5, 1.0).unwrap();
        let levels: Vec<bool> = (0..64).map(|i| (i * 7 % 5) < 2).collect();
        let samples = m.modulate(&levels);
        let max_step = PI * 0.5 / sps as f64;
        for w in samples.windows(2) {
            let step = (w[1] * w[0].conj()).arg().abs();
            assert!(step <= max_step + 1e-12, "phase jumped {step}");
        }
    }

    #[test]
    fn invalid_parameters() {
        assert!(GmskModulator::new(0.0, 8, 0.5, 1.0).is_err());
        assert!(GmskModulator::new(0.4, 1, 0.5, 1.0).is_err());
        assert!(GmskModulator::new(0.4, 8, -0.5, 1.0).is_err());
    }

    #[test]
    fn empty_input() {
        let m = GmskModulator::new(0.4, 8, 0.5, 1.0).unwrap();
        assert!(m.modulate(&[]).is_empty());
    }
}
