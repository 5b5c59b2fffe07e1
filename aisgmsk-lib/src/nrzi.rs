//! NRZI line coding.
//!
//! A logical 0 is sent as a level transition and a logical 1 as no transition. Both directions
//! start from a level of 1 so that `decode(encode(bits)) == bits`.

/// Level both encoder and decoder assume before the first bit.
pub const INITIAL_LEVEL: bool = true;

/// Line code logical bits into transmission levels, one level per bit.
#[must_use]
pub fn encode(bits: &[bool]) -> Vec<bool> {
    let mut level = INITIAL_LEVEL;
    bits.iter()
        .map(|bit| {
            if !bit {
                level = !level;
            }
            level
        })
        .collect()
}

/// Recover logical bits from transmission levels.
#[must_use]
pub fn decode(levels: &[bool]) -> Vec<bool> {
    let mut prev = INITIAL_LEVEL;
    levels
        .iter()
        .map(|level| {
            let bit = *level == prev;
            prev = *level;
            bit
        })
        .collect()
}
