//! Header tokenizer for `Accept-Encoding` and `Content-Encoding`.
//!
//! Both headers are scanned byte by byte after a single normalization pass:
//! horizontal whitespace is dropped and ASCII letters are folded to lowercase.
//! The scanners in [`negotiate`](crate::negotiate) and [`chain`](crate::chain)
//! rely on that form and only ever look for `a..=z` runs.

use http::HeaderValue;

/// Normalize a header value in place.
///
/// Removes spaces and tabs, folds `A-Z` to `a-z` and truncates the buffer to
/// the bytes that remain. Running it twice yields the same bytes.
pub fn tokenize(value: &mut Vec<u8>) {
    let mut end = 0;

    for pos in 0..value.len() {
        let byte = value[pos];
        if byte == b' ' || byte == b'\t' {
            continue;
        }
        value[end] = byte.to_ascii_lowercase();
        end += 1;
    }

    value.truncate(end);
}

/// Copy a header value and tokenize it.
///
/// A missing header tokenizes to an empty buffer.
pub fn tokenized(value: Option<&HeaderValue>) -> Vec<u8> {
    let mut bytes = value.map(|v| v.as_bytes().to_vec()).unwrap_or_default();
    tokenize(&mut bytes);
    bytes
}

/// Lowercase ASCII letter test used by every header scanner.
#[inline]
pub(crate) fn is_alpha(byte: u8) -> bool {
    byte.is_ascii_lowercase()
}

#[inline]
pub(crate) fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}
