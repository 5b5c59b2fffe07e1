//! HDLC style framing of AIS payloads.
//!
//! A frame on the air is a preamble, a flag, the bit-stuffed payload and checksum, and a closing
//! flag. Stuffing guarantees the flag pattern never occurs between the flags.
mod decoder;
mod extract;
mod integrity;
mod stuffing;
mod synchronizer;

pub use decoder::*;
pub use extract::*;
pub use integrity::*;
pub use stuffing::*;
pub use synchronizer::*;

use crate::bits::unpack;

/// Frame delimiter, `01111110`.
pub const FLAG: u8 = 0x7e;

/// Default number of preamble bits.
pub const DEFAULT_PREAMBLE_LEN: usize = 64;

/// Alternating training sequence `0101...` of `len` bits.
#[must_use]
pub fn preamble(len: usize) -> Vec<bool> {
    (0..len).map(|i| i % 2 == 1).collect()
}

/// Build the logical bit sequence for one frame:
/// preamble ‖ flag ‖ stuff(payload ‖ checksum16(payload)) ‖ flag.
#[must_use]
pub fn frame(payload: &[bool], preamble_len: usize) -> Vec<bool> {
    let mut body = Vec::with_capacity(payload.len() + 16);
    body.extend_from_slice(payload);
    body.extend(checksum_bits(checksum16(payload)));

    let flag = unpack(&[FLAG]);
    let mut bits = preamble(preamble_len);
    bits.extend_from_slice(&flag);
    bits.extend(stuff(&body));
    bits.extend_from_slice(&flag);
    bits
}
