//! Codec capability traits and built-in implementations.
//!
//! The middleware never knows how a body is transformed. It only calls the
//! two capabilities defined here:
//! - [`Encoder`]: turns a fully buffered response body into its encoded form
//! - [`Decoder`]: turns a fully buffered request body back into plain bytes
//!
//! Built-in codecs implement both traits:
//! - [`IdentityCodec`]: copies bytes unchanged
//! - [`GzipCodec`]: Gzip via flate2 (requires `gzip` feature)
//! - [`DeflateCodec`]: zlib-wrapped deflate via flate2 (requires `deflate` feature)
//! - [`BrotliCodec`]: Brotli (requires `br` feature)
//! - [`ZstdCodec`]: Zstandard (requires `zstd` feature)

use std::io::{self, Write};

#[cfg(any(feature = "gzip", feature = "deflate", feature = "zstd"))]
use std::io::Read;

use crate::context::CodecContext;

/// Encoder capability used for response bodies.
///
/// `encode` receives the complete body and writes its encoded form to `to`.
/// Whatever reached `to` before an error is returned may already be on the
/// wire, so implementations should fail early when they can.
///
/// # Example
///
/// ```
/// use httpencoder_axum_core::{CodecContext, Encoder};
/// use std::io::{self, Write};
///
/// struct Doubler;
///
/// impl Encoder for Doubler {
///     fn name(&self) -> &str { "doubler" }
///
///     fn encode(&self, _cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
///         for byte in from {
///             to.write_all(&[*byte, *byte])?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Encoder: Send + Sync + 'static {
    /// Self-reported name of the codec.
    ///
    /// Only used for diagnostics. The `Content-Encoding` value announced to
    /// the client is always the registry key the encoder was matched under.
    fn name(&self) -> &str;

    /// Encode `from` into `to`.
    fn encode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()>;
}

/// Decoder capability used for request bodies.
pub trait Decoder: Send + Sync + 'static {
    /// Decode `from` into `to`.
    fn decode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()>;
}

/// Identity codec (no transformation).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Encoder for IdentityCodec {
    fn name(&self) -> &str {
        "identity"
    }

    fn encode(&self, _cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        to.write_all(from)
    }
}

impl Decoder for IdentityCodec {
    fn decode(&self, _cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        to.write_all(from)
    }
}

/// Returns an `Interrupted` error when the request context is cancelled.
///
/// Built-in codecs check this once before doing any work.
#[cfg(any(feature = "gzip", feature = "deflate", feature = "br", feature = "zstd"))]
fn ensure_live(cx: &CodecContext) -> io::Result<()> {
    if cx.is_cancelled() {
        return Err(io::Error::new(
            io::ErrorKind::Interrupted,
            "request deadline exceeded",
        ));
    }
    Ok(())
}

/// Gzip codec using flate2.
///
/// Requires the `gzip` feature.
#[cfg(feature = "gzip")]
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    /// Compression level (0-9). Default is 6.
    pub level: u32,
}

#[cfg(feature = "gzip")]
impl Default for GzipCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

#[cfg(feature = "gzip")]
impl GzipCodec {
    /// Create a new GzipCodec with the specified compression level.
    ///
    /// Level ranges from 0 (no compression) to 9 (best compression).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

#[cfg(feature = "gzip")]
impl Encoder for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn encode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        ensure_live(cx)?;
        let mut encoder = flate2::write::GzEncoder::new(to, flate2::Compression::new(self.level));
        encoder.write_all(from)?;
        encoder.finish()?;
        Ok(())
    }
}

#[cfg(feature = "gzip")]
impl Decoder for GzipCodec {
    fn decode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        ensure_live(cx)?;
        let mut decoder = flate2::read::GzDecoder::new(from);
        copy_all(&mut decoder, to)
    }
}

/// Deflate codec using flate2 (zlib format).
///
/// Note: HTTP "deflate" Content-Encoding uses zlib format (RFC 1950),
/// not raw DEFLATE (RFC 1951).
///
/// Requires the `deflate` feature.
#[cfg(feature = "deflate")]
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    /// Compression level (0-9). Default is 6.
    pub level: u32,
}

#[cfg(feature = "deflate")]
impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

#[cfg(feature = "deflate")]
impl DeflateCodec {
    /// Create a new DeflateCodec with the specified compression level.
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

#[cfg(feature = "deflate")]
impl Encoder for DeflateCodec {
    fn name(&self) -> &str {
        "deflate"
    }

    fn encode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        ensure_live(cx)?;
        let mut encoder =
            flate2::write::ZlibEncoder::new(to, flate2::Compression::new(self.level));
        encoder.write_all(from)?;
        encoder.finish()?;
        Ok(())
    }
}

#[cfg(feature = "deflate")]
impl Decoder for DeflateCodec {
    fn decode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        ensure_live(cx)?;
        let mut decoder = flate2::read::ZlibDecoder::new(from);
        copy_all(&mut decoder, to)
    }
}

/// Brotli codec.
///
/// Requires the `br` feature.
#[cfg(feature = "br")]
#[derive(Debug, Clone, Copy)]
pub struct BrotliCodec {
    /// Compression quality (0-11). Default is 4.
    pub quality: u32,
}

#[cfg(feature = "br")]
impl Default for BrotliCodec {
    fn default() -> Self {
        Self { quality: 4 }
    }
}

#[cfg(feature = "br")]
impl BrotliCodec {
    /// Create a new BrotliCodec with the specified quality level.
    ///
    /// Quality ranges from 0 (fastest) to 11 (best compression).
    pub fn with_quality(quality: u32) -> Self {
        Self {
            quality: quality.min(11),
        }
    }
}

#[cfg(feature = "br")]
impl Encoder for BrotliCodec {
    fn name(&self) -> &str {
        "br"
    }

    fn encode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        use brotli::enc::BrotliEncoderParams;
        ensure_live(cx)?;
        let params = BrotliEncoderParams {
            quality: self.quality as i32,
            ..Default::default()
        };
        let mut to = to;
        brotli::enc::BrotliCompress(&mut io::Cursor::new(from), &mut to, &params)?;
        Ok(())
    }
}

#[cfg(feature = "br")]
impl Decoder for BrotliCodec {
    fn decode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        ensure_live(cx)?;
        let mut to = to;
        brotli::BrotliDecompress(&mut io::Cursor::new(from), &mut to)?;
        Ok(())
    }
}

/// Zstd codec.
///
/// Requires the `zstd` feature.
#[cfg(feature = "zstd")]
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    /// Compression level (1-22). Default is 3.
    pub level: i32,
}

#[cfg(feature = "zstd")]
impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

#[cfg(feature = "zstd")]
impl ZstdCodec {
    /// Create a new ZstdCodec with the specified compression level.
    pub fn with_level(level: i32) -> Self {
        Self {
            level: level.clamp(1, 22),
        }
    }
}

#[cfg(feature = "zstd")]
impl Encoder for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn encode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        ensure_live(cx)?;
        zstd::stream::copy_encode(from, to, self.level)
    }
}

#[cfg(feature = "zstd")]
impl Decoder for ZstdCodec {
    fn decode(&self, cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
        ensure_live(cx)?;
        let mut decoder = zstd::Decoder::new(from)?;
        copy_all(&mut decoder, to)
    }
}

#[cfg(any(feature = "gzip", feature = "deflate", feature = "zstd"))]
fn copy_all(from: &mut dyn Read, to: &mut dyn Write) -> io::Result<()> {
    io::copy(from, to)?;
    Ok(())
}
