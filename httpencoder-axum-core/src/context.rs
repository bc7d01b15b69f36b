//! Request context passed to codecs.
//!
//! Every [`Encoder`](crate::Encoder) and [`Decoder`](crate::Decoder) call
//! receives a [`CodecContext`]. The middleware never times out a codec on its
//! own; a codec that wants to give up early checks
//! [`CodecContext::is_cancelled`].

use http::Extensions;
use std::time::Instant;

/// Request deadline stored in request extensions.
///
/// Insert it from an outer layer (or a handler-specific extractor) to let
/// codecs abandon work for requests nobody is waiting for anymore.
///
/// # Example
///
/// ```rust,ignore
/// use httpencoder_axum_core::Deadline;
/// use std::time::{Duration, Instant};
///
/// req.extensions_mut()
///     .insert(Deadline(Instant::now() + Duration::from_secs(5)));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline(pub Instant);

/// Cancelable context for a single codec call.
///
/// Holds a snapshot of the request extensions taken before the request body
/// or the response body is transformed, so codecs can look up request-scoped
/// values without access to the request itself.
#[derive(Clone, Debug, Default)]
pub struct CodecContext {
    extensions: Extensions,
    deadline: Option<Instant>,
}

impl CodecContext {
    /// Build a context from request extensions.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        Self {
            deadline: extensions.get::<Deadline>().map(|d| d.0),
            extensions: extensions.clone(),
        }
    }

    /// Build a context from a request.
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        Self::from_extensions(req.extensions())
    }

    /// Request extensions captured when the context was built.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Deadline of the request, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once the request deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}
