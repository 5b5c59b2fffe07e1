//! AIS position report (message types 1, 2 and 3) payload packing.
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::bits::{push_field, read_field, sign_extend, BitOrder};
use crate::prelude::*;

/// Position report fields in their on-air units.
///
/// Omitted builder fields default to zero. Values wider than a field are masked to the field
/// width when packed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct Report {
    /// Message type, 1, 2 or 3 for position reports.
    #[builder(default = 1)]
    pub message_type: u8,
    #[builder(default)]
    pub repeat: u8,
    /// Maritime Mobile Service Identity
    pub mmsi: u32,
    /// Navigation status, e.g., 0 for under way using engine.
    #[builder(default)]
    pub status: u8,
    /// Rate of turn indicator, -128 when not available.
    #[builder(default)]
    pub rate_of_turn: i8,
    /// Speed over ground in 0.1 knot, 1023 when not available.
    #[builder(default)]
    pub speed: u16,
    #[builder(default)]
    pub accuracy: bool,
    /// Longitude in 1/10000 minute, 181 degrees when not available.
    #[builder(default)]
    pub longitude: i32,
    /// Latitude in 1/10000 minute, 91 degrees when not available.
    #[builder(default)]
    pub latitude: i32,
    /// Course over ground in 0.1 degree, 3600 when not available.
    #[builder(default)]
    pub course: u16,
    /// True heading in degrees, 511 when not available.
    #[builder(default)]
    pub heading: u16,
    /// UTC second of the fix, 60 when not available.
    #[builder(default)]
    pub timestamp: u8,
}

impl Report {
    /// Packed report length in bits.
    pub const LEN: usize = 168;

    /// Largest MMSI the 30-bit field can carry.
    pub const MMSI_MAX: u32 = (1 << 30) - 1;

    pub const HEADING_NOT_AVAILABLE: u16 = 511;
    pub const COURSE_NOT_AVAILABLE: u16 = 3600;
    pub const SPEED_NOT_AVAILABLE: u16 = 1023;
    pub const TIMESTAMP_NOT_AVAILABLE: u8 = 60;

    // Field widths, in canonical order.
    const MESSAGE_TYPE: usize = 6;
    const REPEAT: usize = 2;
    const MMSI: usize = 30;
    const STATUS: usize = 4;
    const RATE_OF_TURN: usize = 8;
    const SPEED: usize = 10;
    const ACCURACY: usize = 1;
    const LONGITUDE: usize = 28;
    const LATITUDE: usize = 27;
    const COURSE: usize = 12;
    const HEADING: usize = 9;
    const TIMESTAMP: usize = 6;

    /// Pack into exactly [Report::LEN] bits. The 25 bits following the timestamp (maneuver,
    /// spare, RAIM, and communication state) are zero.
    #[must_use]
    pub fn encode(&self, order: BitOrder) -> Vec<bool> {
        let mut bits = Vec::with_capacity(Self::LEN);
        let fields: [(u64, usize); 12] = [
            (self.message_type.into(), Self::MESSAGE_TYPE),
            (self.repeat.into(), Self::REPEAT),
            (self.mmsi.into(), Self::MMSI),
            (self.status.into(), Self::STATUS),
            (self.rate_of_turn as u64, Self::RATE_OF_TURN),
            (self.speed.into(), Self::SPEED),
            (self.accuracy.into(), Self::ACCURACY),
            (self.longitude as u64, Self::LONGITUDE),
            (self.latitude as u64, Self::LATITUDE),
            (self.course.into(), Self::COURSE),
            (self.heading.into(), Self::HEADING),
            (self.timestamp.into(), Self::TIMESTAMP),
        ];
        for (value, width) in fields {
            push_field(&mut bits, value, width, order);
        }
        bits.resize(Self::LEN, false);
        bits
    }

    /// Unpack a report from the first [Report::LEN] bits of `bits`.
    ///
    /// `order` must match the order used to pack.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if there are fewer than [Report::LEN] bits.
    pub fn decode(bits: &[bool], order: BitOrder) -> Result<Self> {
        if bits.len() < Self::LEN {
            return Err(Error::NotEnoughData {
                actual: bits.len(),
                minimum: Self::LEN,
            });
        }
        let mut offset = 0;
        let mut next = |width: usize| {
            let value = read_field(&bits[offset..], width, order);
            offset += width;
            value
        };

        Ok(Report {
            message_type: next(Self::MESSAGE_TYPE) as u8,
            repeat: next(Self::REPEAT) as u8,
            mmsi: next(Self::MMSI) as u32,
            status: next(Self::STATUS) as u8,
            rate_of_turn: sign_extend(next(Self::RATE_OF_TURN), Self::RATE_OF_TURN) as i8,
            speed: next(Self::SPEED) as u16,
            accuracy: next(Self::ACCURACY) == 1,
            longitude: sign_extend(next(Self::LONGITUDE), Self::LONGITUDE) as i32,
            latitude: sign_extend(next(Self::LATITUDE), Self::LATITUDE) as i32,
            course: next(Self::COURSE) as u16,
            heading: next(Self::HEADING) as u16,
            timestamp: next(Self::TIMESTAMP) as u8,
        })
    }

    #[must_use]
    pub fn longitude_degrees(&self) -> f64 {
        f64::from(self.longitude) / MINUTES_E4_PER_DEGREE
    }

    #[must_use]
    pub fn latitude_degrees(&self) -> f64 {
        f64::from(self.latitude) / MINUTES_E4_PER_DEGREE
    }
}

const MINUTES_E4_PER_DEGREE: f64 = 600_000.0;

/// Convert decimal degrees to the 1/10000 minute units used for latitude and longitude.
#[must_use]
pub fn position_from_degrees(degrees: f64) -> i32 {
    (degrees * MINUTES_E4_PER_DEGREE).round() as i32
}

/// Convert knots to 0.1 knot units, clamped to the 102.2 knot maximum.
#[must_use]
pub fn speed_from_knots(knots: f64) -> u16 {
    (knots.clamp(0.0, 102.2) * 10.0).round() as u16
}

/// Convert course in degrees to 0.1 degree units.
#[must_use]
pub fn course_from_degrees(degrees: f64) -> u16 {
    (degrees.rem_euclid(360.0) * 10.0).round() as u16 % 3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn bench_report() -> Report {
        Report::builder()
            .mmsi(123_456_789)
            .speed(speed_from_knots(12.3))
            .accuracy(true)
            .longitude(position_from_degrees(-46.633308))
            .latitude(position_from_degrees(-23.55052))
            .course(2100)
            .heading(Report::HEADING_NOT_AVAILABLE)
            .timestamp(30)
            .build()
    }

    #[test]
    fn encode_is_168_bits() {
        let bits = Report::builder().mmsi(1).build().encode(BitOrder::MsbFirst);
        assert_eq!(bits.len(), Report::LEN);
    }

    #[test]
    fn encode_known_prefix() {
        // type 1, repeat 0, mmsi 123456789, everything else zero
        let report = Report::builder().mmsi(123_456_789).build();
        let bytes = crate::bits::pack(&report.encode(BitOrder::MsbFirst));
        assert_eq!(bytes[..5], [0x04, 0x1d, 0x6f, 0x34, 0x54]);
        assert!(bytes[5..].iter().all(|b| *b == 0));
    }

    #[test]
    fn encode_full_report() {
        let bytes = crate::bits::pack(&bench_report().encode(BitOrder::MsbFirst));
        assert_eq!(
            hex::encode(bytes),
            "041d6f34540007bf2a8797f286378834ffbc000000"
        );
    }

    #[test_case(BitOrder::MsbFirst; "msb first")]
    #[test_case(BitOrder::LsbFirst; "lsb first")]
    fn decode_inverts_encode(order: BitOrder) {
        let report = Report {
            message_type: 3,
            repeat: 2,
            status: 5,
            rate_of_turn: -127,
            ..bench_report()
        };
        let bits = report.encode(order);
        assert_eq!(Report::decode(&bits, order).unwrap(), report);
    }

    #[test]
    fn oversized_values_are_masked() {
        let report = Report::builder().mmsi(u32::MAX).message_type(0xff).build();
        let decoded = Report::decode(&report.encode(BitOrder::MsbFirst), BitOrder::MsbFirst)
            .unwrap();
        assert_eq!(decoded.mmsi, Report::MMSI_MAX);
        assert_eq!(decoded.message_type, 0x3f);
    }

    #[test]
    fn decode_too_short() {
        let err = Report::decode(&[false; 167], BitOrder::MsbFirst).unwrap_err();
        assert!(matches!(
            err,
            Error::NotEnoughData {
                actual: 167,
                minimum: 168
            }
        ));
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(position_from_degrees(181.0), 108_600_000);
        assert_eq!(position_from_degrees(-23.55052), -14_130_312);
        assert_eq!(speed_from_knots(200.0), 1022);
        assert_eq!(speed_from_knots(-1.0), 0);
        assert_eq!(course_from_degrees(-90.0), 2700);
        assert_eq!(course_from_degrees(360.0), 0);

        let report = bench_report();
        assert!((report.latitude_degrees() + 23.55052).abs() < 1e-6);
    }
}
