//! Example: echo server with request decoding and response encoding
//!
//! Every built-in codec (gzip, deflate, br, zstd) is registered for both
//! directions. Requests get a five second deadline that codecs can observe.
//!
//! Run with: cargo run --bin server
//! Test with:
//!   curl -s --compressed http://localhost:3000/hello -v
//!   echo hello | gzip | curl -s --data-binary @- -H 'Content-Encoding: gzip' \
//!     -H 'Accept-Encoding: br' http://localhost:3000/echo | brotli -d

use axum::{
    Router,
    extract::Request,
    middleware,
    routing::{get, post},
};
use httpencoder_axum::{Deadline, DecoderRegistry, EncoderRegistry};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const REQUEST_DEADLINE: Duration = Duration::from_secs(5);

async fn hello() -> &'static str {
    "Hello from httpencoder-axum!\n"
}

/// Returns the decoded request body unchanged.
async fn echo(body: String) -> String {
    body
}

async fn with_deadline(mut req: Request) -> Request {
    req.extensions_mut()
        .insert(Deadline(Instant::now() + REQUEST_DEADLINE));
    req
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,httpencoder_axum=debug")),
        )
        .init();

    let encoders = EncoderRegistry::standard();
    let decoders = DecoderRegistry::standard();
    tracing::info!(?encoders, ?decoders, "registered codecs");

    let app = Router::new()
        .route("/hello", get(hello))
        .route("/echo", post(echo))
        .layer(httpencoder_axum::new(encoders, decoders))
        .layer(middleware::map_request(with_deadline));

    let addr = httpencoder_axum_examples::server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
