use tracing::{debug, trace};

use super::{destuff, FLAG, MIN_FRAME_LEN};
use crate::bits::pack;

/// What a single bit did to a [Synchronizer].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Absorbed into the current segment, or ignored while searching for the first flag.
    Bit,
    /// Completed a flag. Carries the destuffed bits since the previous flag, or `None` for the
    /// first flag found.
    Flag(Option<Vec<bool>>),
}

/// Scans a logical bit stream for flags and hands back the bits between them.
///
/// Flags may start at any bit offset. Anything before the first flag is ignored.
#[derive(Debug, Default)]
pub struct Synchronizer {
    // last 8 bits seen, newest in the lsb
    reg: u8,
    // bits seen since the last flag, including the bits of the next flag
    segment: Vec<bool>,
    synced: bool,
    /// Number of flags found.
    pub flags: usize,
}

impl Synchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one bit.
    pub fn step(&mut self, bit: bool) -> Event {
        self.reg = (self.reg << 1) | u8::from(bit);
        self.segment.push(bit);
        // consecutive flags may share a zero, but the first flag needs 8 real bits
        let min_len = if self.synced { 7 } else { 8 };
        if self.segment.len() < min_len || self.reg != FLAG {
            return Event::Bit;
        }

        let closed = self.synced.then(|| {
            let keep = self.segment.len().saturating_sub(8);
            destuff(&self.segment[..keep])
        });
        self.flags += 1;
        self.synced = true;
        self.segment.clear();
        Event::Flag(closed)
    }

    /// Feed one bit, appending the flag delimited bytes it completes to `out`.
    ///
    /// Data bytes equal to [FLAG] are not escaped, so a destuffed payload containing `0x7e` on
    /// a byte boundary will look like a delimiter to [super::extract_frames].
    pub fn push(&mut self, bit: bool, out: &mut Vec<u8>) {
        if let Event::Flag(closed) = self.step(bit) {
            if let Some(bits) = closed {
                out.extend(pack(&bits));
            }
            out.push(FLAG);
        }
    }

    /// Flush bits following the last flag. They can only ever form an unterminated frame.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.synced && !self.segment.is_empty() {
            out.extend(pack(&destuff(&self.segment)));
        }
        self.segment.clear();
    }
}

/// Realign a logical (already NRZI decoded) bit stream into flag delimited bytes suitable for
/// [super::extract_frames].
#[must_use]
pub fn align(bits: &[bool]) -> Vec<u8> {
    let mut sync = Synchronizer::new();
    let mut out = Vec::with_capacity(bits.len() / 8 + 1);
    for bit in bits {
        sync.push(*bit, &mut out);
    }
    sync.finish(&mut out);
    debug!(bits = bits.len(), flags = sync.flags, bytes = out.len(), "aligned");
    out
}

/// Frames between the flags of a logical bit stream, destuffed and packed msb first.
///
/// Frame boundaries come from the bit-level flags, so a destuffed byte equal to [FLAG] stays
/// part of its frame. Frames of [MIN_FRAME_LEN] bytes or less are dropped, as are the bits
/// after the last flag.
#[must_use]
pub fn split_frames(bits: &[bool]) -> Vec<Vec<u8>> {
    let mut sync = Synchronizer::new();
    let mut frames = Vec::default();
    for bit in bits {
        if let Event::Flag(Some(closed)) = sync.step(*bit) {
            let data = pack(&closed);
            if data.len() > MIN_FRAME_LEN {
                frames.push(data);
            } else if !data.is_empty() {
                trace!(len = data.len(), "dropping short frame");
            }
        }
    }
    debug!(bits = bits.len(), flags = sync.flags, frames = frames.len(), "split");
    frames
}
