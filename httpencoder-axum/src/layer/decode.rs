//! Request stage: decodes bodies listed in `Content-Encoding`.
//!
//! See the [parent module](super) documentation for how it composes with the
//! response stage.

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderValue, Request};
use httpencoder_axum_core::header::tokenized;
use httpencoder_axum_core::{BufferPool, CodecContext, DecoderRegistry, decode_chain};
use std::sync::Arc;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service, ServiceExt};

use crate::error::EncodingError;

/// Layer that replaces encoded request bodies with their decoded form.
///
/// Requests without `Content-Encoding`, or any request when the registry is
/// empty, reach the inner service untouched. Otherwise the body is read whole
/// and run through the listed decoders left to right. On failure the inner
/// service is never called:
///
/// | Failure                          | Status |
/// |----------------------------------|--------|
/// | body could not be read           | 400    |
/// | encoding token not registered    | 415    |
/// | decoder returned an error        | 500    |
#[derive(Debug, Clone)]
pub struct DecodeLayer {
    decoders: Arc<DecoderRegistry>,
    pool: BufferPool,
}

impl DecodeLayer {
    pub fn new(decoders: DecoderRegistry) -> Self {
        Self::from_shared(Arc::new(decoders), BufferPool::new())
    }

    pub(crate) fn from_shared(decoders: Arc<DecoderRegistry>, pool: BufferPool) -> Self {
        Self { decoders, pool }
    }

    /// Use `pool` for body buffers.
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }
}

impl<S> Layer<S> for DecodeLayer {
    type Service = DecodeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DecodeService {
            inner,
            decoders: self.decoders.clone(),
            pool: self.pool.clone(),
        }
    }
}

/// Service produced by [`DecodeLayer`].
#[derive(Debug, Clone)]
pub struct DecodeService<S> {
    inner: S,
    decoders: Arc<DecoderRegistry>,
    pool: BufferPool,
}

impl<S> Service<Request<Body>> for DecodeService<S>
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

        if self.decoders.is_empty() {
            return Box::pin(async move { inner.oneshot(req).await });
        }

        let content_encoding = tokenized(req.headers().get(CONTENT_ENCODING));
        if content_encoding.is_empty() {
            return Box::pin(async move { inner.oneshot(req).await });
        }

        let decoders = self.decoders.clone();
        let pool = self.pool.clone();

        Box::pin(async move {
            match decode_request(req, &content_encoding, &decoders, &pool).await {
                Ok(req) => inner.oneshot(req).await,
                Err(err) => {
                    tracing::warn!(
                        status = %err.status(),
                        encoding = err.encoding().unwrap_or_default(),
                        error = %err,
                        "rejecting encoded request body"
                    );
                    Ok(err.into_response())
                }
            }
        })
    }
}

/// Read the whole body and replace it with its decoded form.
async fn decode_request(
    req: Request<Body>,
    content_encoding: &[u8],
    decoders: &DecoderRegistry,
    pool: &BufferPool,
) -> Result<Request<Body>, EncodingError> {
    let cx = CodecContext::from_request(&req);
    let (mut parts, body) = req.into_parts();

    let mut buf = pool.acquire();
    super::read_body(body, &mut buf)
        .await
        .map_err(EncodingError::BodyRead)?;
    let received = buf.len();

    let decoded = decode_chain(&cx, content_encoding, decoders, pool, buf)?;

    tracing::debug!(
        content_encoding = %String::from_utf8_lossy(content_encoding),
        received,
        decoded = decoded.len(),
        "decoded request body"
    );

    parts.headers.remove(CONTENT_ENCODING);
    parts.headers.remove(TRANSFER_ENCODING);
    parts
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(decoded.len()));

    Ok(Request::from_parts(parts, Body::from(decoded.to_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use httpencoder_axum_core::{Decoder, IdentityCodec};
    use std::convert::Infallible;
    use bytes::Bytes;
    use http_body::{Frame, SizeHint};
    use std::io::{self, Write};
    use tower::ServiceBuilder;

    /// Keeps every other byte.
    struct Halve;

    impl Decoder for Halve {
        fn decode(&self, _cx: &CodecContext, to: &mut dyn Write, from: &[u8]) -> io::Result<()> {
            for byte in from.iter().step_by(2) {
                to.write_all(&[*byte])?;
            }
            Ok(())
        }
    }

    struct Corrupt;

    impl Decoder for Corrupt {
        fn decode(&self, _cx: &CodecContext, _to: &mut dyn Write, _from: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt stream"))
        }
    }

    /// Writes the value of the `Tenant` extension instead of decoding.
    struct TenantEcho;

    #[derive(Clone)]
    struct Tenant(&'static str);

    impl Decoder for TenantEcho {
        fn decode(&self, cx: &CodecContext, to: &mut dyn Write, _from: &[u8]) -> io::Result<()> {
            let tenant = cx
                .extensions()
                .get::<Tenant>()
                .ok_or_else(|| io::Error::other("missing tenant"))?;
            to.write_all(tenant.0.as_bytes())
        }
    }

    /// Empty body that advertises an absurd exact length.
    struct HugeHint;

    impl http_body::Body for HugeHint {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
            Poll::Ready(None)
        }

        fn size_hint(&self) -> SizeHint {
            SizeHint::with_exact(u64::MAX)
        }
    }

    fn decoders() -> DecoderRegistry {
        DecoderRegistry::new()
            .with("halve", Arc::new(Halve))
            .with("identity", Arc::new(IdentityCodec))
            .with("corrupt", Arc::new(Corrupt))
            .with("tenant", Arc::new(TenantEcho))
    }

    /// Echoes the request body along with the headers the handler saw.
    async fn echo(req: Request<Body>) -> Result<Response, Infallible> {
        let encoding = req
            .headers()
            .get(CONTENT_ENCODING)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_else(|| "none".into());
        let length = req
            .headers()
            .get(CONTENT_LENGTH)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_else(|| "none".into());
        let transfer = req
            .headers()
            .get(TRANSFER_ENCODING)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_else(|| "none".into());
        let body = req.into_body().collect().await.unwrap().to_bytes();

        Ok(Response::builder()
            .header("x-content-encoding", encoding)
            .header("x-content-length", length)
            .header("x-transfer-encoding", transfer)
            .body(Body::from(body))
            .unwrap())
    }

    async fn body_of(resp: Response) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_decodes_body_and_rewrites_headers() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "halve")
            .header(CONTENT_LENGTH, "8")
            .body(Body::from("AABBCCDD"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-content-encoding").unwrap(), "none");
        assert_eq!(resp.headers().get("x-content-length").unwrap(), "4");
        assert_eq!(body_of(resp).await, b"ABCD");
    }

    #[tokio::test]
    async fn test_chain_applies_in_order() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "HALVE, identity,halve")
            .body(Body::from("AAAABBBB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(body_of(resp).await, b"AB");
    }

    #[tokio::test]
    async fn test_missing_header_passes_through() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder().body(Body::from("AABB")).unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.headers().get("x-content-length").unwrap(), "none");
        assert_eq!(body_of(resp).await, b"AABB");
    }

    #[tokio::test]
    async fn test_blank_header_passes_through() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, " \t ")
            .body(Body::from("AABB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, b"AABB");
    }

    #[tokio::test]
    async fn test_empty_registry_passes_through() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(DecoderRegistry::new()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "nope")
            .body(Body::from("AABB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-content-encoding").unwrap(), "nope");
        assert_eq!(body_of(resp).await, b"AABB");
    }

    #[tokio::test]
    async fn test_unsupported_encoding() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "halve, nope")
            .body(Body::from("AABB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(resp.headers().get("x-content-encoding").is_none());
    }

    #[tokio::test]
    async fn test_decoder_failure() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "corrupt")
            .body(Body::from("AABB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(resp).await, b"corrupt stream\n");
    }

    #[tokio::test]
    async fn test_unreadable_body() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let chunks: Vec<Result<&'static str, io::Error>> = vec![
            Ok("AA"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let req = Request::builder()
            .header(CONTENT_ENCODING, "halve")
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await, b"failed to read http request body\n");
    }

    #[tokio::test]
    async fn test_decoders_see_request_extensions() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "tenant")
            .extension(Tenant("acme"))
            .body(Body::from("ignored"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(body_of(resp).await, b"acme");
    }

    #[tokio::test]
    async fn test_buffers_return_to_pool() {
        let pool = BufferPool::new();
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()).with_pool(pool.clone()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "halve")
            .body(Body::from("AABB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(body_of(resp).await, b"AB");
        assert_eq!(pool.idle(), 2);
    }

    #[tokio::test]
    async fn test_huge_size_hint_with_empty_body() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "identity")
            .body(Body::new(HugeHint))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-content-length").unwrap(), "0");
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_decoding_drops_transfer_encoding() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(CONTENT_ENCODING, "halve")
            .header(TRANSFER_ENCODING, "chunked")
            .body(Body::from("AABB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.headers().get("x-transfer-encoding").unwrap(), "none");
        assert_eq!(resp.headers().get("x-content-length").unwrap(), "2");
        assert_eq!(body_of(resp).await, b"AB");
    }

    #[tokio::test]
    async fn test_passthrough_keeps_transfer_encoding() {
        let svc = ServiceBuilder::new()
            .layer(DecodeLayer::new(decoders()))
            .service_fn(echo);

        let req = Request::builder()
            .header(TRANSFER_ENCODING, "chunked")
            .body(Body::from("AABB"))
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();

        assert_eq!(resp.headers().get("x-transfer-encoding").unwrap(), "chunked");
        assert_eq!(body_of(resp).await, b"AABB");
    }
}
