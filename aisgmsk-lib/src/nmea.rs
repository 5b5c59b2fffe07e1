//! `!AIVDM` sentence rendering.
//!
//! Payload bits are armored six at a time into printable ASCII and wrapped in a single-fragment
//! sentence with an XOR checksum.
use crate::bits::BitOrder;
use crate::Report;

/// Radio channel the sentence claims the message arrived on.
pub const CHANNEL: char = 'A';

fn armor_char(val: u8) -> char {
    let val = if val > 39 { val + 8 } else { val };
    char::from(val + 48)
}

fn dearmor_char(ch: char) -> Option<u8> {
    match u8::try_from(ch).ok()? {
        code @ b'0'..=b'W' => Some(code - 48),
        code @ b'`'..=b'w' => Some(code - 56),
        _ => None,
    }
}

/// Armor `bits` into 6-bit ASCII. Returns the armored text and the number of zero fill bits
/// appended to complete the last character.
#[must_use]
pub fn armor(bits: &[bool]) -> (String, usize) {
    let fill = (6 - bits.len() % 6) % 6;
    let text = bits
        .chunks(6)
        .map(|chunk| {
            let val = chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, bit)| acc | (u8::from(*bit) << (5 - i)));
            armor_char(val)
        })
        .collect();
    (text, fill)
}

/// Reverse of [armor]. `None` if `text` has a character outside the armoring alphabet.
#[must_use]
pub fn dearmor(text: &str, fill: usize) -> Option<Vec<bool>> {
    let mut bits = Vec::with_capacity(text.len() * 6);
    for ch in text.chars() {
        let val = dearmor_char(ch)?;
        bits.extend((0..6).rev().map(|i| (val >> i) & 1 == 1));
    }
    bits.truncate(bits.len().saturating_sub(fill));
    Some(bits)
}

/// XOR of every byte between `!` and `*`.
#[must_use]
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Render payload bits as a single fragment `!AIVDM` sentence.
#[must_use]
pub fn sentence(bits: &[bool]) -> String {
    let (text, fill) = armor(bits);
    let body = format!("AIVDM,1,1,,{CHANNEL},{text},{fill}");
    format!("!{body}*{:02X}", checksum(&body))
}

/// Render a report as an `!AIVDM` sentence.
#[must_use]
pub fn report_sentence(report: &Report) -> String {
    // sentences always carry the AIS field order
    sentence(&report.encode(BitOrder::MsbFirst))
}

/// Parse a single fragment sentence back to payload bits. `None` if the sentence is not
/// well formed or its checksum does not match.
#[must_use]
pub fn parse(line: &str) -> Option<Vec<bool>> {
    let line = line.trim().strip_prefix('!')?;
    let (body, cs) = line.split_once('*')?;
    if u8::from_str_radix(cs, 16).ok()? != checksum(body) {
        return None;
    }
    let parts: Vec<&str> = body.split(',').collect();
    if parts.len() != 7 || !parts[0].ends_with("VDM") {
        return None;
    }
    dearmor(parts[5], parts[6].parse().ok()?)
}
