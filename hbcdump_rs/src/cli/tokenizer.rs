//! Command line tokenizing and argument helpers.

/// Split `line` on spaces.
///
/// Runs of spaces (leading, trailing or repeated) never produce empty tokens.
/// Tabs are not separators and stay part of the token they appear in.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(' ').filter(|token| !token.is_empty()).collect()
}

/// Remove the first occurrence of `needle`, keeping the order of the rest.
///
/// Returns `true` if a token was removed.
pub fn find_and_remove_one(tokens: &mut Vec<&str>, needle: &str) -> bool {
    match tokens.iter().position(|token| *token == needle) {
        Some(idx) => {
            tokens.remove(idx);
            true
        }
        None => false,
    }
}

/// Parse a non-negative integer, detecting the radix from its prefix:
/// `0x` hex, `0b` binary, `0o` or a bare leading `0` octal, else decimal.
pub fn parse_u32(token: &str) -> Option<u32> {
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let (digits, radix) = if let Some(rest) = strip_prefix_ci(token, "0x") {
        (rest, 16)
    } else if let Some(rest) = strip_prefix_ci(token, "0b") {
        (rest, 2)
    } else if let Some(rest) = strip_prefix_ci(token, "0o") {
        (rest, 8)
    } else if token.len() > 1 && token.starts_with('0') {
        (&token[1..], 8)
    } else {
        (token, 10)
    };
    if digits.starts_with(['+', '-']) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

fn strip_prefix_ci<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let head = token.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &token[prefix.len()..])
}
