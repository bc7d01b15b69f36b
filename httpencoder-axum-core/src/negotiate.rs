//! `Accept-Encoding` negotiation.
//!
//! The tokenized header is scanned left to right as alternating
//! (encoding-name, quality) pairs. Qualities are kept as fixed-point integers
//! in `0..=1000` so ties compare exactly.
//!
//! The quality parser is lenient. These inputs all count as the maximum
//! quality:
//!
//! - no qualifier at all (`gzip`)
//! - a first digit other than `0` (`q=1`, `q=1.234`, `q=9`)
//! - a qualifier without digits before the next comma (`q=,br`)
//!
//! Names end at the first byte outside `a..=z`, so `gzip2` is matched as
//! `gzip`.

use std::sync::Arc;

use crate::codec::Encoder;
use crate::header::{is_alpha, is_digit};
use crate::registry::EncoderRegistry;

/// Quality of an entry without an explicit fractional `q` value (1.000).
pub const MAX_QUALITY: u16 = 1000;

/// Outcome of a successful negotiation.
#[derive(Clone)]
pub struct Negotiated<'r> {
    /// Registry key the encoder matched under. Announced as `Content-Encoding`.
    pub encoding: &'r str,
    /// The selected encoder.
    pub encoder: &'r Arc<dyn Encoder>,
    /// Quality the client attached to the selected entry.
    pub quality: u16,
}

impl std::fmt::Debug for Negotiated<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiated")
            .field("encoding", &self.encoding)
            .field("encoder", &self.encoder.name())
            .field("quality", &self.quality)
            .finish()
    }
}

/// Select the registered encoder the client prefers most.
///
/// Only a strictly higher quality displaces the current choice, so the first
/// of several equally weighted entries wins. Entries with quality zero are
/// never selected. Returns `None` when nothing in the header is registered.
pub fn negotiate<'r>(accept_encoding: &[u8], encoders: &'r EncoderRegistry) -> Option<Negotiated<'r>> {
    let mut best: Option<Negotiated<'r>> = None;
    let mut pos = 0;

    while pos < accept_encoding.len() {
        let (name, next) = next_encoding_name(accept_encoding, pos);
        let (quality, next) = next_quality(accept_encoding, next);
        pos = next + 1;

        let Some((encoding, encoder)) = encoders.get_key_value(name) else {
            continue;
        };

        let current = best.as_ref().map_or(0, |b| b.quality);
        if quality > current {
            best = Some(Negotiated {
                encoding,
                encoder,
                quality,
            });
        }
    }

    best
}

/// Extract the next run of lowercase letters at or after `start`.
///
/// Returns the run and the position just past it.
pub fn next_encoding_name(header: &[u8], start: usize) -> (&[u8], usize) {
    let mut start = start;
    while start < header.len() && !is_alpha(header[start]) {
        start += 1;
    }

    let mut end = start;
    while end < header.len() && is_alpha(header[end]) {
        end += 1;
    }

    (&header[start..end], end)
}

/// Read the quality that follows an encoding name.
///
/// Possible values are between 0 and 1 included, with up to three decimal
/// digits. Returns the quality in thousandths and the new scan position.
pub fn next_quality(header: &[u8], pos: usize) -> (u16, usize) {
    let mut pos = pos;
    while pos < header.len() && !is_digit(header[pos]) && header[pos] != b',' {
        pos += 1;
    }

    if pos >= header.len() || header[pos] != b'0' {
        return (MAX_QUALITY, pos);
    }

    // skip "0."
    parse_fraction(header, pos + 2)
}

fn parse_fraction(header: &[u8], pos: usize) -> (u16, usize) {
    let mut pos = pos;
    let mut quality = 0u16;

    for _ in 0..3 {
        quality *= 10;
        if pos < header.len() && is_digit(header[pos]) {
            quality += u16::from(header[pos] - b'0');
            pos += 1;
        }
    }

    (quality, pos)
}
