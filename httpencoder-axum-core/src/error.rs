//! Errors raised while applying a `Content-Encoding` decode chain.

use std::io;

/// Decode chain errors.
///
/// Both variants are detected before the wrapped handler runs, so the
/// middleware can always turn them into a clean error response.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// A `Content-Encoding` token has no registered decoder.
    #[error("unsupported Content-Encoding \"{0}\"")]
    UnsupportedEncoding(String),

    /// A decoder reported an error.
    #[error("{encoding} decoding failed: {source}")]
    Transform {
        encoding: String,
        #[source]
        source: io::Error,
    },
}

impl ChainError {
    /// The encoding token the error refers to.
    pub fn encoding(&self) -> &str {
        match self {
            ChainError::UnsupportedEncoding(encoding) => encoding,
            ChainError::Transform { encoding, .. } => encoding,
        }
    }
}
