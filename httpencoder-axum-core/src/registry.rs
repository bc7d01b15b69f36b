//! Encoding-name to codec registries.
//!
//! A registry is assembled once with the consuming [`Registry::with`] builder
//! and then handed to the middleware, which keeps it behind an `Arc` and only
//! ever reads from it. Keys are lowercased on insert so they line up with
//! tokenized header values.
//!
//! The key is the single source of truth for an encoding: it is what
//! `Accept-Encoding` / `Content-Encoding` tokens are matched against and what
//! the response `Content-Encoding` announces. [`Encoder::name`] is never
//! consulted for either.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::{Decoder, Encoder};

/// Registry of response encoders keyed by encoding name.
pub type EncoderRegistry = Registry<dyn Encoder>;

/// Registry of request decoders keyed by encoding name.
pub type DecoderRegistry = Registry<dyn Decoder>;

/// Immutable mapping from encoding name to a shared codec.
///
/// # Example
///
/// ```rust,ignore
/// use httpencoder_axum_core::{EncoderRegistry, GzipCodec};
/// use std::sync::Arc;
///
/// let encoders = EncoderRegistry::new().with("gzip", Arc::new(GzipCodec::default()));
/// ```
pub struct Registry<T: ?Sized> {
    entries: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `codec` under `name`, replacing any previous entry.
    pub fn with(mut self, name: impl Into<String>, codec: Arc<T>) -> Self {
        let mut name = name.into();
        name.make_ascii_lowercase();
        if self.entries.insert(name, codec).is_some() {
            tracing::debug!("registry entry replaced");
        }
        self
    }

    /// Look up the codec registered under a tokenized header name.
    pub fn get(&self, name: &[u8]) -> Option<&Arc<T>> {
        let name = std::str::from_utf8(name).ok()?;
        self.entries.get(name)
    }

    /// Look up a codec and return the registry key alongside it.
    pub fn get_key_value(&self, name: &[u8]) -> Option<(&str, &Arc<T>)> {
        let name = std::str::from_utf8(name).ok()?;
        self.entries
            .get_key_value(name)
            .map(|(key, codec)| (key.as_str(), codec))
    }

    /// Registered encoding names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_tuple("Registry").field(&names).finish()
    }
}

impl<T: ?Sized, K: Into<String>> FromIterator<(K, Arc<T>)> for Registry<T> {
    fn from_iter<I: IntoIterator<Item = (K, Arc<T>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |registry, (name, codec)| registry.with(name, codec))
    }
}

impl Registry<dyn Encoder> {
    /// Registry with every built-in encoder enabled by crate features.
    ///
    /// Keys: `gzip`, `deflate`, `br`, `zstd` (each behind its feature).
    pub fn standard() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "gzip")]
        {
            registry = registry.with("gzip", Arc::new(crate::codec::GzipCodec::default()));
        }
        #[cfg(feature = "deflate")]
        {
            registry = registry.with("deflate", Arc::new(crate::codec::DeflateCodec::default()));
        }
        #[cfg(feature = "br")]
        {
            registry = registry.with("br", Arc::new(crate::codec::BrotliCodec::default()));
        }
        #[cfg(feature = "zstd")]
        {
            registry = registry.with("zstd", Arc::new(crate::codec::ZstdCodec::default()));
        }
        registry
    }
}

impl Registry<dyn Decoder> {
    /// Registry with every built-in decoder enabled by crate features.
    ///
    /// Keys: `gzip`, `deflate`, `br`, `zstd` (each behind its feature).
    pub fn standard() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "gzip")]
        {
            registry = registry.with("gzip", Arc::new(crate::codec::GzipCodec::default()));
        }
        #[cfg(feature = "deflate")]
        {
            registry = registry.with("deflate", Arc::new(crate::codec::DeflateCodec::default()));
        }
        #[cfg(feature = "br")]
        {
            registry = registry.with("br", Arc::new(crate::codec::BrotliCodec::default()));
        }
        #[cfg(feature = "zstd")]
        {
            registry = registry.with("zstd", Arc::new(crate::codec::ZstdCodec::default()));
        }
        registry
    }
}
