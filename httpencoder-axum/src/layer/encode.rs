//! Response stage: negotiates `Accept-Encoding` and encodes response bodies.
//!
//! See the [parent module](super) documentation for how it composes with the
//! request stage.

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{StreamExt, stream};
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, UPGRADE};
use http::{HeaderMap, HeaderValue, Request};
use httpencoder_axum_core::header::tokenized;
use httpencoder_axum_core::{
    BufferPool, CodecContext, Encoder, EncoderRegistry, PooledBuffer, negotiate, sniff_content_type,
};
use std::io;
use std::sync::Arc;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service, ServiceExt};

use crate::error::EncodingError;

/// Layer that encodes response bodies with the encoding the client prefers.
///
/// The request passes through untouched when it carries `Upgrade`, when its
/// `Accept-Encoding` is missing or blank, or when no listed encoding is
/// registered. Otherwise the inner service's response body is buffered whole,
/// then:
///
/// - a response that already has `Content-Encoding` is sent as captured
/// - any other response gets `Content-Encoding` set to the negotiated
///   registry key, a sniffed `Content-Type` if it had none, and no
///   `Content-Length`; its body is encoded while it is being sent
#[derive(Debug, Clone)]
pub struct EncodeLayer {
    encoders: Arc<EncoderRegistry>,
    pool: BufferPool,
}

impl EncodeLayer {
    pub fn new(encoders: EncoderRegistry) -> Self {
        Self::from_shared(Arc::new(encoders), BufferPool::new())
    }

    pub(crate) fn from_shared(encoders: Arc<EncoderRegistry>, pool: BufferPool) -> Self {
        Self { encoders, pool }
    }

    /// Use `pool` for body buffers.
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }
}

impl<S> Layer<S> for EncodeLayer {
    type Service = EncodeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EncodeService {
            inner,
            encoders: self.encoders.clone(),
            pool: self.pool.clone(),
        }
    }
}

/// Service produced by [`EncodeLayer`].
#[derive(Debug, Clone)]
pub struct EncodeService<S> {
    inner: S,
    encoders: Arc<EncoderRegistry>,
    pool: BufferPool,
}

/// The encoder picked for one response.
struct Selected {
    encoding: HeaderValue,
    encoder: Arc<dyn Encoder>,
}

impl<S> Service<Request<Body>> for EncodeService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let inner = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, inner);

        let Some(selected) = self.select(req.headers()) else {
            return Box::pin(async move { inner.oneshot(req).await });
        };

        let cx = CodecContext::from_request(&req);
        let pool = self.pool.clone();

        Box::pin(async move {
            let response = inner.oneshot(req).await?;
            Ok(encode_response(response, cx, selected, &pool).await)
        })
    }
}

impl<S> EncodeService<S> {
    fn select(&self, headers: &HeaderMap) -> Option<Selected> {
        if headers.get(UPGRADE).is_some_and(|v| !v.is_empty()) {
            tracing::debug!("upgrade request, response left unencoded");
            return None;
        }

        let accept_encoding = tokenized(headers.get(ACCEPT_ENCODING));
        if accept_encoding.is_empty() {
            return None;
        }

        let Some(negotiated) = negotiate(&accept_encoding, &self.encoders) else {
            tracing::debug!(
                accept_encoding = %String::from_utf8_lossy(&accept_encoding),
                "no registered encoding accepted"
            );
            return None;
        };

        tracing::debug!(
            encoding = negotiated.encoding,
            quality = negotiated.quality,
            "negotiated response encoding"
        );

        // keys that matched a token are plain a..=z runs
        let encoding = HeaderValue::from_str(negotiated.encoding).ok()?;
        Some(Selected {
            encoding,
            encoder: negotiated.encoder.clone(),
        })
    }
}

/// Capture the inner response and encode its body.
async fn encode_response(
    response: Response,
    cx: CodecContext,
    selected: Selected,
    pool: &BufferPool,
) -> Response {
    let (mut parts, body) = response.into_parts();

    let mut captured = pool.acquire();
    if let Err(err) = super::read_body(body, &mut captured).await {
        let err = EncodingError::ResponseBody(err);
        tracing::error!(error = %err, "failed to capture response body");
        return err.into_response();
    }

    if parts
        .headers
        .get(CONTENT_ENCODING)
        .is_some_and(|v| !v.is_empty())
    {
        return Response::from_parts(parts, Body::from(captured.to_bytes()));
    }

    if parts.headers.get(CONTENT_TYPE).is_none_or(|v| v.is_empty()) {
        parts.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(sniff_content_type(&captured)),
        );
    }
    parts.headers.insert(CONTENT_ENCODING, selected.encoding.clone());
    parts.headers.remove(CONTENT_LENGTH);

    Response::from_parts(parts, encoded_body(cx, selected, captured))
}

/// Body that runs the encoder when first polled.
///
/// Status and headers are already committed by then, so an encoder failure
/// can only cut the body short: whatever was produced is sent, followed by
/// the error.
fn encoded_body(cx: CodecContext, selected: Selected, captured: PooledBuffer) -> Body {
    let chunks = stream::once(async move {
        let mut out = Vec::with_capacity(captured.len());
        let result = selected.encoder.encode(&cx, &mut out, &captured);
        drop(captured);

        let mut chunks: Vec<Result<Bytes, io::Error>> = Vec::with_capacity(2);
        if !out.is_empty() {
            chunks.push(Ok(Bytes::from(out)));
        }
        if let Err(err) = result {
            tracing::error!(
                encoding = ?selected.encoding,
                encoder = selected.encoder.name(),
                error = %err,
                "response encoding failed after headers were sent"
            );
            chunks.push(Err(err));
        }
        chunks
    })
    .flat_map(stream::iter);

    Body::from_stream(chunks)
}
