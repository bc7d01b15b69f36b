//! # httpencoder-axum
//!
//! Tower middleware for [Axum](https://github.com/tokio-rs/axum) that handles
//! HTTP content codings on both sides of a handler:
//!
//! - request bodies listed in `Content-Encoding` are decoded before the
//!   handler reads them
//! - response bodies are encoded with the registered encoding the client
//!   rates highest in `Accept-Encoding`
//!
//! Codecs are plain trait objects registered under an encoding name, so any
//! transformation (compression or not) can be plugged in. Built-in gzip,
//! deflate, brotli and zstd codecs are available behind crate features.
//!
//! ## Getting Started
//!
//! ```rust,ignore
//! use axum::{Router, routing::post};
//! use httpencoder_axum::{DecoderRegistry, EncoderRegistry};
//!
//! let app = Router::new()
//!     .route("/echo", post(|body: String| async move { body }))
//!     .layer(httpencoder_axum::new(
//!         EncoderRegistry::standard(),
//!         DecoderRegistry::standard(),
//!     ));
//! ```
//!
//! Custom codecs implement [`Encoder`] and/or [`Decoder`]:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! let encoders = EncoderRegistry::new().with("x-custom", Arc::new(MyCodec));
//! ```
//!
//! See the [`layer`] module for the stage order and the status codes the
//! middleware answers with.

pub mod error;
pub mod layer;

pub use error::EncodingError;
pub use layer::{DecodeLayer, DecodeService, EncodeLayer, EncodeService, EncodingLayer};

pub use httpencoder_axum_core::{
    BufferPool, CodecContext, Deadline, Decoder, DecoderRegistry, Encoder, EncoderRegistry,
    IdentityCodec, Registry,
};

#[cfg(feature = "br")]
pub use httpencoder_axum_core::BrotliCodec;
#[cfg(feature = "deflate")]
pub use httpencoder_axum_core::DeflateCodec;
#[cfg(feature = "gzip")]
pub use httpencoder_axum_core::GzipCodec;
#[cfg(feature = "zstd")]
pub use httpencoder_axum_core::ZstdCodec;

/// Build the combined decode and encode middleware.
///
/// Shorthand for [`EncodingLayer::new`].
pub fn new(encoders: EncoderRegistry, decoders: DecoderRegistry) -> EncodingLayer {
    EncodingLayer::new(encoders, decoders)
}
