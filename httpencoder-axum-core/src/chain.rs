//! Ordered `Content-Encoding` decode chain.
//!
//! `Content-Encoding` lists codings in the order they were applied, so the
//! chain walks the tokenized header left to right and feeds the output of
//! each decoder into the next one.
//!
//! The walk takes the run of `a..=z` starting exactly at the current
//! position as the token, then skips a single separator byte. An empty run
//! (for example between the two commas of `gzip,,br`) is looked up like any
//! other token and normally ends the chain as unsupported.

use crate::context::CodecContext;
use crate::error::ChainError;
use crate::header::is_alpha;
use crate::pool::{BufferPool, PooledBuffer};
use crate::registry::DecoderRegistry;

/// Iterator over the encoding tokens of a tokenized `Content-Encoding` value.
#[derive(Clone, Debug)]
pub struct ContentCodings<'h> {
    header: &'h [u8],
    pos: usize,
}

impl<'h> ContentCodings<'h> {
    pub fn new(header: &'h [u8]) -> Self {
        Self { header, pos: 0 }
    }
}

impl<'h> Iterator for ContentCodings<'h> {
    type Item = &'h [u8];

    fn next(&mut self) -> Option<&'h [u8]> {
        if self.pos >= self.header.len() {
            return None;
        }

        let start = self.pos;
        let mut end = start;
        while end < self.header.len() && is_alpha(self.header[end]) {
            end += 1;
        }

        // skip the separator
        self.pos = end + 1;
        Some(&self.header[start..end])
    }
}

/// Decode `body` through every coding listed in `content_encoding`.
///
/// Each step decodes the current buffer into a spare buffer from `pool` and
/// swaps the two. On success the fully decoded buffer is returned; on error
/// every buffer goes back to the pool and the caller keeps nothing, so there
/// is no partially decoded state to observe.
pub fn decode_chain(
    cx: &CodecContext,
    content_encoding: &[u8],
    decoders: &DecoderRegistry,
    pool: &BufferPool,
    body: PooledBuffer,
) -> Result<PooledBuffer, ChainError> {
    let mut current = body;
    let mut spare: Option<PooledBuffer> = None;

    for token in ContentCodings::new(content_encoding) {
        let encoding = String::from_utf8_lossy(token);
        let Some(decoder) = decoders.get(token) else {
            return Err(ChainError::UnsupportedEncoding(encoding.into_owned()));
        };

        let mut next = spare.take().unwrap_or_else(|| pool.acquire());
        next.clear();

        decoder
            .decode(cx, &mut *next, &current)
            .map_err(|source| ChainError::Transform {
                encoding: encoding.to_string(),
                source,
            })?;

        tracing::trace!(
            encoding = %encoding,
            from = current.len(),
            to = next.len(),
            "decoded request body"
        );

        std::mem::swap(&mut current, &mut next);
        spare = Some(next);
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decoder, IdentityCodec};
    use std::io::{self, Write};
    use std::sync::Arc;

    /// Keeps every other byte, undoing a byte-doubling encoder.
    struct Halve;

    impl Decoder for Halve {
        fn decode(&self, _cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
            for byte in from.iter().step_by(2) {
                to.write_all(&[*byte])?;
            }
            Ok(())
        }
    }

    /// Keeps every fourth byte.
    struct Quarter;

    impl Decoder for Quarter {
        fn decode(&self, _cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
            for byte in from.iter().step_by(4) {
                to.write_all(&[*byte])?;
            }
            Ok(())
        }
    }

    /// Appends a marker so the application order is visible.
    struct Mark(u8);

    impl Decoder for Mark {
        fn decode(&self, _cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
            to.write_all(from)?;
            to.write_all(&[self.0])
        }
    }

    struct Broken;

    impl Decoder for Broken {
        fn decode(&self, _cx: &CodecContext, to: &mut dyn Write, _from: &[u8]) -> io::Result<()> {
            to.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::InvalidData, "broken stream"))
        }
    }

    fn decoders() -> DecoderRegistry {
        DecoderRegistry::new()
            .with("halve", Arc::new(Halve))
            .with("quarter", Arc::new(Quarter))
            .with("identity", Arc::new(IdentityCodec))
            .with("a", Arc::new(Mark(b'a')))
            .with("b", Arc::new(Mark(b'b')))
            .with("broken", Arc::new(Broken))
    }

    fn run(header: &[u8], body: &[u8]) -> Result<Vec<u8>, ChainError> {
        let pool = BufferPool::new();
        let mut buf = pool.acquire();
        buf.extend_from_slice(body);
        decode_chain(&CodecContext::default(), header, &decoders(), &pool, buf)
            .map(|decoded| decoded.to_vec())
    }

    #[test]
    fn test_content_codings_tokens() {
        let tokens: Vec<&[u8]> = ContentCodings::new(b"gzip,br").collect();
        assert_eq!(tokens, vec![&b"gzip"[..], &b"br"[..]]);

        let tokens: Vec<&[u8]> = ContentCodings::new(b"gzip,,br").collect();
        assert_eq!(tokens, vec![&b"gzip"[..], &b""[..], &b"br"[..]]);

        let tokens: Vec<&[u8]> = ContentCodings::new(b"x-gzip").collect();
        assert_eq!(tokens, vec![&b"x"[..], &b"gzip"[..]]);

        assert_eq!(ContentCodings::new(b"").count(), 0);
    }

    #[test]
    fn test_single_decoder() {
        assert_eq!(run(b"halve", b"AABBCCDD").unwrap(), b"ABCD");
    }

    #[test]
    fn test_decoders_applied_left_to_right() {
        assert_eq!(run(b"a,b", b"x").unwrap(), b"xab");
        assert_eq!(run(b"b,a", b"x").unwrap(), b"xba");
    }

    #[test]
    fn test_inverse_chain_recovers_original() {
        // "ab" doubled, then every byte of the result quadrupled
        let encoded = b"aaaaaaaabbbbbbbb";
        assert_eq!(run(b"quarter,halve", encoded).unwrap(), b"ab");
        assert_eq!(run(b"halve,halve,halve", encoded).unwrap(), b"ab");
    }

    #[test]
    fn test_unsupported_token() {
        let err = run(b"halve,nope", b"AABB").unwrap_err();
        assert!(matches!(err, ChainError::UnsupportedEncoding(ref e) if e == "nope"));
    }

    #[test]
    fn test_empty_token_is_unsupported() {
        let err = run(b"identity,,identity", b"x").unwrap_err();
        assert!(matches!(err, ChainError::UnsupportedEncoding(ref e) if e.is_empty()));
    }

    #[test]
    fn test_transform_failure() {
        let err = run(b"identity,broken", b"x").unwrap_err();
        match err {
            ChainError::Transform { encoding, source } => {
                assert_eq!(encoding, "broken");
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_buffers_return_to_pool() {
        let pool = BufferPool::new();
        let mut buf = pool.acquire();
        buf.extend_from_slice(b"AABB");
        let decoded = decode_chain(
            &CodecContext::default(),
            b"halve,identity",
            &decoders(),
            &pool,
            buf,
        )
        .unwrap();
        assert_eq!(&decoded[..], b"AB");
        assert_eq!(pool.idle(), 1);
        drop(decoded);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_buffers_return_to_pool_on_error() {
        let pool = BufferPool::new();
        let mut buf = pool.acquire();
        buf.extend_from_slice(b"AABB");
        let result = decode_chain(
            &CodecContext::default(),
            b"halve,broken",
            &decoders(),
            &pool,
            buf,
        );
        assert!(result.is_err());
        assert_eq!(pool.idle(), 2);
    }
}
