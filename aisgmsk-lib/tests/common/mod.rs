use std::path::PathBuf;

use num_complex::Complex64;

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

/// Ideal hard slicer: the sign of the phase step at the middle of each symbol.
pub fn slice(samples: &[Complex64], sps: usize) -> Vec<bool> {
    (0..samples.len() / sps)
        .map(|k| {
            let c = k * sps + sps / 2;
            (samples[c] * samples[c - 1].conj()).arg() > 0.0
        })
        .collect()
}
