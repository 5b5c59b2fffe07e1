use crc::{Crc, CRC_16_GENIBUS};

/// CRC-16/CCITT as used for the AIS frame check sequence: poly 0x1021, init 0xffff, input
/// processed most-significant bit first, output inverted.
///
/// This is the `CRC_16_GENIBUS` catalog entry.
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_GENIBUS);

/// Length of the checksum in bytes.
pub const CHECKSUM_LEN: usize = 2;

const POLY: u16 = 0x1021;

/// Compute the 16-bit checksum over an arbitrary length, unaligned bit sequence.
///
/// For bit sequences that are a multiple of 8 long this equals [CRC16] over the
/// most-significant-bit-first packed bytes.
#[must_use]
pub fn checksum16(bits: &[bool]) -> u16 {
    let mut reg: u16 = 0xffff;
    for bit in bits {
        let feedback = (reg >> 15 == 1) ^ *bit;
        reg <<= 1;
        if feedback {
            reg ^= POLY;
        }
    }
    !reg
}

/// The checksum as 16 bits, most-significant bit first, as it is appended to a payload.
#[must_use]
pub fn checksum_bits(checksum: u16) -> Vec<bool> {
    (0..16).rev().map(|i| (checksum >> i) & 1 == 1).collect()
}

/// Split a frame into its payload and checksum and verify the checksum.
///
/// The checksum is the trailing 2 bytes, big-endian. Returns the payload bytes and whether
/// the recomputed checksum matches. Frames too short to contain a checksum are never ok.
#[must_use]
pub fn verify(frame: &[u8]) -> (Vec<u8>, bool) {
    if frame.len() < CHECKSUM_LEN {
        return (frame.to_vec(), false);
    }
    let (payload, trailer) = frame.split_at(frame.len() - CHECKSUM_LEN);
    let expected = u16::from_be_bytes([trailer[0], trailer[1]]);
    (payload.to_vec(), CRC16.checksum(payload) == expected)
}
