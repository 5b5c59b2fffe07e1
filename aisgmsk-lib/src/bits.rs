//! Bit sequence helpers.
//!
//! Bits are carried as `bool`s with no inherent byte alignment. Packing into bytes is always
//! most-significant bit first.
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Order in which the bits of a single field are written to a bit sequence.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    /// Most significant bit first, the AIS convention.
    #[default]
    MsbFirst,
    LsbFirst,
}

/// Append the low `width` bits of `value` to `bits`. Bits above `width` are masked off.
pub(crate) fn push_field(bits: &mut Vec<bool>, value: u64, width: usize, order: BitOrder) {
    assert!(width <= 64, "field width must be <= 64");
    match order {
        BitOrder::MsbFirst => {
            for i in (0..width).rev() {
                bits.push((value >> i) & 1 == 1);
            }
        }
        BitOrder::LsbFirst => {
            for i in 0..width {
                bits.push((value >> i) & 1 == 1);
            }
        }
    }
}

/// Read `width` bits as an unsigned value.
pub(crate) fn read_field(bits: &[bool], width: usize, order: BitOrder) -> u64 {
    assert!(width <= 64, "field width must be <= 64");
    let mut value = 0u64;
    for (i, bit) in bits[..width].iter().enumerate() {
        if *bit {
            let shift = match order {
                BitOrder::MsbFirst => width - 1 - i,
                BitOrder::LsbFirst => i,
            };
            value |= 1 << shift;
        }
    }
    value
}

/// Sign extend the low `width` bits of `value`.
pub(crate) fn sign_extend(value: u64, width: usize) -> i64 {
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

/// Pack bits into bytes, most significant bit first. A trailing partial byte is dropped.
#[must_use]
pub fn pack(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, b| (acc << 1) | u8::from(*b)))
        .collect()
}

/// Unpack bytes into bits, most significant bit first.
#[must_use]
pub fn unpack(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for b in bytes {
        for i in (0..8).rev() {
            bits.push((b >> i) & 1 == 1);
        }
    }
    bits
}

/// Read a recovered-bit capture where each byte is one hard-sliced bit; any non-zero byte is a 1.
///
/// # Errors
/// Any error reading from `reader`.
pub fn read_recovered_bits<R: Read>(mut reader: R) -> Result<Vec<bool>> {
    let mut raw = Vec::default();
    reader.read_to_end(&mut raw)?;
    Ok(raw.into_iter().map(|b| b > 0).collect())
}

/// Inverse of [read_recovered_bits].
#[must_use]
pub fn to_recovered_bytes(bits: &[bool]) -> Vec<u8> {
    bits.iter().map(|b| u8::from(*b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_field_masks_wide_values() {
        let mut bits = Vec::default();
        push_field(&mut bits, 0b1_0101, 4, BitOrder::MsbFirst);
        assert_eq!(bits, vec![false, true, false, true]);
    }

    #[test]
    fn push_field_lsb_first() {
        let mut bits = Vec::default();
        push_field(&mut bits, 0b0011, 4, BitOrder::LsbFirst);
        assert_eq!(bits, vec![true, true, false, false]);
        assert_eq!(read_field(&bits, 4, BitOrder::LsbFirst), 0b0011);
    }

    #[test]
    fn sign_extend_negative() {
        assert_eq!(sign_extend(0xff, 8), -1);
        assert_eq!(sign_extend(0x7f, 8), 127);
        assert_eq!(sign_extend((1 << 27) - 1, 28), (1 << 27) - 1);
        assert_eq!(sign_extend(1 << 27, 28), -(1 << 27));
    }

    #[test]
    fn pack_drops_partial_byte() {
        let mut bits = unpack(&[0x7e, 0x01]);
        bits.push(true);
        assert_eq!(pack(&bits), vec![0x7e, 0x01]);
    }

    #[test]
    fn recovered_bits_any_nonzero_is_one() {
        let raw: &[u8] = &[0, 1, 255, 0, 7];
        let bits = read_recovered_bits(raw).unwrap();
        assert_eq!(bits, vec![false, true, true, false, true]);
    }
}
