//! Base64 VLQ decoding for source map `mappings`.

/// Base64 alphabet used by VLQ fields.
const VLQ_BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const CONTINUATION_BIT: i64 = 0x20;
const VALUE_MASK: i64 = 0x1F;

fn decode_base64_char(c: char) -> Option<i64> {
    VLQ_BASE64_CHARS
        .iter()
        .position(|&ch| ch as char == c)
        .map(|pos| pos as i64)
}

/// Decode one VLQ value from `chars`.
///
/// Digits are little-endian groups of five bits; bit 5 of every digit marks a
/// continuation. The lowest bit of the assembled value is the sign.
///
/// Returns `None` when the iterator is exhausted, a character is outside the
/// alphabet, or the value does not fit in an `i32`.
pub fn decode_vlq_value(chars: &mut impl Iterator<Item = char>) -> Option<i32> {
    let mut accumulated: i64 = 0;
    let mut shift = 0;
    loop {
        let digit = decode_base64_char(chars.next()?)?;
        accumulated |= (digit & VALUE_MASK) << shift;
        if digit & CONTINUATION_BIT == 0 {
            break;
        }
        shift += 5;
        if shift > 32 {
            return None;
        }
    }

    let magnitude = accumulated >> 1;
    let value = if accumulated & 1 != 0 {
        -magnitude
    } else {
        magnitude
    };
    i32::try_from(value).ok()
}

/// Decode every VLQ field of one comma-separated segment.
pub fn decode_segment(segment: &str) -> Option<Vec<i32>> {
    let mut chars = segment.chars().peekable();
    let mut fields = Vec::new();
    while chars.peek().is_some() {
        fields.push(decode_vlq_value(&mut chars)?);
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vlq_single_char() {
        // "A" = 0, "C" = 1, "D" = -1
        assert_eq!(decode_vlq_value(&mut "A".chars()), Some(0));
        assert_eq!(decode_vlq_value(&mut "C".chars()), Some(1));
        assert_eq!(decode_vlq_value(&mut "D".chars()), Some(-1));
    }

    #[test]
    fn test_decode_vlq_multi_char() {
        // "gB" = 16, "2H" = 123, "hB" = -16
        assert_eq!(decode_vlq_value(&mut "gB".chars()), Some(16));
        assert_eq!(decode_vlq_value(&mut "2H".chars()), Some(123));
        assert_eq!(decode_vlq_value(&mut "hB".chars()), Some(-16));
    }

    #[test]
    fn test_decode_vlq_rejects_bad_input() {
        assert_eq!(decode_vlq_value(&mut "".chars()), None);
        assert_eq!(decode_vlq_value(&mut "!".chars()), None);
        // Dangling continuation bit.
        assert_eq!(decode_vlq_value(&mut "g".chars()), None);
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("AAAA"), Some(vec![0, 0, 0, 0]));
        assert_eq!(decode_segment("UACE"), Some(vec![10, 0, 1, 2]));
        assert_eq!(decode_segment("gBAAC"), Some(vec![16, 0, 0, 1]));
        assert_eq!(decode_segment("A!"), None);
    }
}
