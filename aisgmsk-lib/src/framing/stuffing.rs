/// Number of consecutive 1 bits after which a 0 is stuffed.
pub const MAX_ONES: usize = 5;

/// Insert a 0 after every run of [MAX_ONES] consecutive 1s.
///
/// The output never contains six consecutive 1s, so it can never contain a flag.
#[must_use]
pub fn stuff(bits: &[bool]) -> Vec<bool> {
    let mut out = Vec::with_capacity(bits.len() + bits.len() / MAX_ONES);
    let mut ones = 0;
    for bit in bits {
        out.push(*bit);
        if *bit {
            ones += 1;
            if ones == MAX_ONES {
                out.push(false);
                ones = 0;
            }
        } else {
            ones = 0;
        }
    }
    out
}

/// Remove stuffed bits. After [MAX_ONES] 1s have been output the next input bit is dropped
/// without being counted.
#[must_use]
pub fn destuff(bits: &[bool]) -> Vec<bool> {
    let mut out = Vec::with_capacity(bits.len());
    let mut ones = 0;
    let mut skip = false;
    for bit in bits {
        if skip {
            skip = false;
            continue;
        }
        out.push(*bit);
        if *bit {
            ones += 1;
            if ones == MAX_ONES {
                skip = true;
                ones = 0;
            }
        } else {
            ones = 0;
        }
    }
    out
}
