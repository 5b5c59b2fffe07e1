use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, span, warn, Level};

use super::{split_frames, verify};
use crate::bits::{unpack, BitOrder};
use crate::{nrzi, Report};

/// A frame recovered from a bit stream along with the result of checking its checksum.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// All frame bytes between the flags, including the trailing checksum.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    /// Frame bytes without the checksum.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// True if the checksum matched.
    pub ok: bool,
    /// The position report, if the payload is long enough and carries a position report
    /// message type. Provided even when `ok` is false for inspection.
    pub report: Option<Report>,
}

impl DecodedFrame {
    fn from_frame(data: Vec<u8>, order: BitOrder) -> Self {
        let (payload, ok) = verify(&data);
        let report = Report::decode(&unpack(&payload), order)
            .ok()
            .filter(|r| (1..=3).contains(&r.message_type));
        DecodedFrame {
            data,
            payload,
            ok,
            report,
        }
    }
}

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(dat: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(dat))
    }
}

/// Recovers frames from hard-sliced line levels.
///
/// The decode runs NRZI decoding, flag synchronization with destuffing and byte packing of
/// each segment between flags, and finally checksum verification. A payload byte that happens
/// to equal the flag does not split its frame.
///
/// # Examples
/// ```
/// use aisgmsk::{Decoder, BitOrder};
///
/// let levels: Vec<bool> = vec![true; 512];
/// let frames = Decoder::new()
///     .with_bit_order(BitOrder::MsbFirst)
///     .decode(&levels);
/// assert!(frames.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    nrzi: bool,
    bit_order: BitOrder,
    num_threads: Option<usize>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Decoder {
            nrzi: true,
            bit_order: BitOrder::default(),
            num_threads: None,
        }
    }

    /// Treat the input as logical bits rather than NRZI levels.
    #[must_use]
    pub fn without_nrzi(mut self) -> Self {
        self.nrzi = false;
        self
    }

    /// Field bit order used to unpack reports. Must match the encoder.
    #[must_use]
    pub fn with_bit_order(mut self, order: BitOrder) -> Self {
        self.bit_order = order;
        self
    }

    /// Number of threads used to verify frames. The default is rayon's global pool.
    #[must_use]
    pub fn with_num_threads(mut self, num: usize) -> Self {
        self.num_threads = Some(num);
        self
    }

    /// Decode all frames found in `levels`, in stream order.
    #[must_use]
    pub fn decode(&self, levels: &[bool]) -> Vec<DecodedFrame> {
        let span = span!(Level::DEBUG, "decode", levels = levels.len());
        let _guard = span.enter();

        let bits = if self.nrzi {
            nrzi::decode(levels)
        } else {
            levels.to_vec()
        };
        let frames = split_frames(&bits);
        debug!(count = frames.len(), "extracted frames");

        let order = self.bit_order;
        let verify_all = move || -> Vec<DecodedFrame> {
            frames
                .into_par_iter()
                .map(|data| DecodedFrame::from_frame(data, order))
                .collect()
        };

        match self.num_threads {
            None => verify_all(),
            Some(num) => match rayon::ThreadPoolBuilder::new().num_threads(num).build() {
                Ok(pool) => pool.install(verify_all),
                Err(err) => {
                    warn!("failed to build verify pool with {num} threads, using global: {err}");
                    verify_all()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{frame, FLAG};

    fn report_levels(mmsi: u32) -> Vec<bool> {
        let payload = Report::builder().mmsi(mmsi).build().encode(BitOrder::MsbFirst);
        nrzi::encode(&frame(&payload, 64))
    }

    #[test]
    fn decodes_single_frame() {
        let frames = Decoder::new().decode(&report_levels(123_456_789));
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert!(frame.ok);
        assert_eq!(frame.data.len(), 23);
        assert_eq!(frame.payload.len(), 21);
        assert_eq!(frame.report.as_ref().unwrap().mmsi, 123_456_789);
    }

    #[test]
    fn flag_byte_in_payload() {
        // second payload byte is the top of the mmsi
        let mmsi = 0x7e << 22;
        let payload = Report::builder().mmsi(mmsi).build().encode(BitOrder::MsbFirst);
        assert_eq!(crate::bits::pack(&payload)[1], FLAG);

        let frames = Decoder::new().decode(&nrzi::encode(&frame(&payload, 64)));
        assert_eq!(frames.len(), 1);
        assert!(frames[0].ok);
        assert_eq!(frames[0].data.len(), 23);
        assert_eq!(frames[0].report.as_ref().unwrap().mmsi, mmsi);
    }

    #[test]
    fn flag_bytes_across_mmsi_range() {
        let mut levels = Vec::default();
        let mmsis: Vec<u32> = (200_000_000..200_002_000).collect();
        for mmsi in &mmsis {
            let payload = Report::builder().mmsi(*mmsi).build().encode(BitOrder::MsbFirst);
            levels.extend(frame(&payload, 8));
        }
        let frames = Decoder::new().without_nrzi().decode(&levels);
        let ok: Vec<u32> = frames
            .iter()
            .filter(|f| f.ok)
            .filter_map(|f| f.report.as_ref().map(|r| r.mmsi))
            .collect();
        assert_eq!(ok, mmsis);
    }

    #[test]
    fn decodes_logical_bits() {
        let payload = Report::builder().mmsi(7).build().encode(BitOrder::MsbFirst);
        let frames = Decoder::new().without_nrzi().decode(&frame(&payload, 16));
        assert_eq!(frames.len(), 1);
        assert!(frames[0].ok);
    }

    #[test]
    fn corrupt_frame_is_surfaced() {
        let payload = Report::builder().mmsi(123_456_789).build().encode(BitOrder::MsbFirst);
        let mut bits = frame(&payload, 64);
        // flip a bit inside the mmsi, well clear of any stuffed bit
        bits[64 + 8 + 20] = !bits[64 + 8 + 20];

        let frames = Decoder::new().without_nrzi().decode(&bits);
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].ok);
        assert!(frames[0].report.is_some());
    }

    #[test]
    fn preserves_order_with_threads() {
        let mut levels = Vec::default();
        for mmsi in 1..=8u32 {
            let payload = Report::builder().mmsi(mmsi).build().encode(BitOrder::MsbFirst);
            levels.extend(frame(&payload, 8));
        }
        let frames = Decoder::new()
            .without_nrzi()
            .with_num_threads(2)
            .decode(&levels);

        let mmsis: Vec<u32> = frames
            .iter()
            .filter_map(|f| f.report.as_ref().map(|r| r.mmsi))
            .collect();
        assert_eq!(mmsis, (1..=8).collect::<Vec<u32>>());
    }

    #[test]
    fn serializes_hex() {
        let frame = DecodedFrame::from_frame(vec![FLAG, 0x01, 0x02], BitOrder::MsbFirst);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["data"], "7e0102");
        assert_eq!(json["payload"], "7e");
    }
}
