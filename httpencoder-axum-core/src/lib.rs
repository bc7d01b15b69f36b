//! Core types for httpencoder-axum.
//!
//! This crate holds everything that does not depend on a particular HTTP
//! server: the codec capability traits, the registries that map header tokens
//! to codecs, the header micro-parsers and the buffer pool shared by the
//! request and response stages.
//!
//! ## Modules
//!
//! - [`codec`]: [`Encoder`] / [`Decoder`] traits and built-in codecs
//! - [`context`]: [`CodecContext`] handed to every codec call
//! - [`registry`]: [`EncoderRegistry`] / [`DecoderRegistry`]
//! - [`header`]: `Accept-Encoding` / `Content-Encoding` tokenizer
//! - [`negotiate`]: quality-value negotiation
//! - [`chain`]: ordered `Content-Encoding` decode chain
//! - [`pool`]: reusable body buffers
//! - [`sniff`]: `Content-Type` detection for untyped bodies

pub mod chain;
pub mod codec;
pub mod context;
mod error;
pub mod header;
pub mod negotiate;
pub mod pool;
pub mod registry;
pub mod sniff;

pub use chain::decode_chain;
pub use codec::*;
pub use context::{CodecContext, Deadline};
pub use error::ChainError;
pub use negotiate::{MAX_QUALITY, Negotiated, negotiate};
pub use pool::{BufferPool, PooledBuffer};
pub use registry::{DecoderRegistry, EncoderRegistry, Registry};
pub use sniff::sniff_content_type;
