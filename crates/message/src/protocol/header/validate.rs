//! RFC 7230 header name and value checks.
//!
//! Values are screened for CRLF injection: only a `\r\n` followed by a space or a
//! horizontal tab (legacy folding) may appear, and it is collapsed to a single space
//! once the value is accepted.

use crate::ensure;
use crate::protocol::ArgumentError;

/// Returns true for the token characters allowed in header names.
#[inline]
pub(crate) fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'\'' | b'`' | b'#' | b'$' | b'%' | b'&' | b'*' | b'+' | b'.' | b'^' | b'_' | b'|' | b'~' | b'!' | b'-')
}

pub(crate) fn header_name(name: &str) -> Result<(), ArgumentError> {
    ensure!(!name.is_empty() && name.bytes().all(is_tchar), ArgumentError::header_name(name));
    Ok(())
}

#[inline]
fn is_value_byte(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\r' | 0x20..=0x7E | 0x80..=0xFE)
}

fn has_bare_line_break(bytes: &[u8]) -> bool {
    bytes.iter().enumerate().any(|(index, &b)| match b {
        b'\n' => index == 0 || bytes[index - 1] != b'\r',
        b'\r' => bytes.get(index + 1) != Some(&b'\n') || !matches!(bytes.get(index + 2), Some(b' ' | b'\t')),
        _ => false,
    })
}

/// Validates a header value and returns its canonical form.
pub(crate) fn header_value(value: &str) -> Result<String, ArgumentError> {
    let bytes = value.as_bytes();

    ensure!(!has_bare_line_break(bytes), ArgumentError::header_value(value));
    ensure!(bytes.iter().all(|&b| is_value_byte(b)), ArgumentError::header_value(value));

    let folded = value.replace("\r\n\t", " ").replace("\r\n ", " ");
    Ok(folded.trim_matches([' ', '\t']).to_string())
}
