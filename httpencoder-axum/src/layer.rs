//! Middleware layers for `Content-Encoding` handling.
//!
//! - [`DecodeLayer`]: decodes request bodies listed in `Content-Encoding`.
//! - [`EncodeLayer`]: negotiates `Accept-Encoding` and encodes response bodies.
//! - [`EncodingLayer`]: both of the above, sharing one buffer pool.
//!
//! ## Stack Order
//!
//! [`EncodingLayer`] wraps the handler as `encode(decode(handler))`:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              EncodeService              │  ← Accept-Encoding, response body
//! │  ┌───────────────────────────────────┐  │
//! │  │           DecodeService           │  │  ← Content-Encoding, request body
//! │  │  ┌─────────────────────────────┐  │  │
//! │  │  │           Handler           │  │  │
//! │  │  └─────────────────────────────┘  │  │
//! │  └───────────────────────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Error responses produced by the decode stage (415, 400, 500) pass through
//! the encode stage like any other response, so they are encoded when the
//! client asked for it.

mod decode;
mod encode;

pub use decode::{DecodeLayer, DecodeService};
pub use encode::{EncodeLayer, EncodeService};

use axum::body::Body;
use http_body::Body as _;
use http_body_util::BodyExt;
use httpencoder_axum_core::{BufferPool, DecoderRegistry, EncoderRegistry};
use std::sync::Arc;
use tower::Layer;

/// Layer that decodes request bodies and encodes response bodies.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, routing::post};
/// use httpencoder_axum::{DecoderRegistry, EncoderRegistry};
///
/// let app = Router::new()
///     .route("/echo", post(echo))
///     .layer(httpencoder_axum::new(
///         EncoderRegistry::standard(),
///         DecoderRegistry::standard(),
///     ));
/// ```
#[derive(Debug, Clone)]
pub struct EncodingLayer {
    encoders: Arc<EncoderRegistry>,
    decoders: Arc<DecoderRegistry>,
    pool: BufferPool,
}

impl EncodingLayer {
    /// Create a layer from the given registries.
    pub fn new(encoders: EncoderRegistry, decoders: DecoderRegistry) -> Self {
        Self {
            encoders: Arc::new(encoders),
            decoders: Arc::new(decoders),
            pool: BufferPool::new(),
        }
    }

    /// Use `pool` for body buffers instead of a pool private to this layer.
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

impl<S> Layer<S> for EncodingLayer {
    type Service = EncodeService<DecodeService<S>>;

    fn layer(&self, inner: S) -> Self::Service {
        let decode = DecodeLayer::from_shared(self.decoders.clone(), self.pool.clone());
        let encode = EncodeLayer::from_shared(self.encoders.clone(), self.pool.clone());
        encode.layer(decode.layer(inner))
    }
}

/// Upper bound on the capacity reserved up front from a body's size hint.
const MAX_RESERVE: u64 = 64 * 1024;

/// Drain `body` into `buf`.
///
/// The size hint comes from the peer (`Content-Length`), so only a bounded
/// amount is reserved ahead of the data actually arriving.
async fn read_body(mut body: Body, buf: &mut Vec<u8>) -> Result<(), axum::Error> {
    let hint = body.size_hint().lower().min(MAX_RESERVE);
    buf.reserve(hint as usize);

    while let Some(frame) = body.frame().await {
        if let Ok(data) = frame?.into_data() {
            buf.extend_from_slice(&data);
        }
    }

    Ok(())
}
