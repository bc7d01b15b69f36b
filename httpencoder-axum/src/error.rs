use axum::{
    body::Body,
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode, header};
use httpencoder_axum_core::ChainError;
use std::io;

/// Errors the middleware answers on behalf of the wrapped service.
///
/// Every variant is detected before the response status is committed, so it
/// always becomes a complete plain-text error response.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// The request body could not be read.
    #[error("failed to read http request body")]
    BodyRead(#[source] axum::Error),

    /// A `Content-Encoding` token has no registered decoder.
    #[error("unsupported Content-Encoding")]
    UnsupportedEncoding(String),

    /// A codec reported an error.
    #[error("{source}")]
    Transform {
        encoding: String,
        #[source]
        source: io::Error,
    },

    /// The wrapped service's response body failed while being captured.
    #[error("failed to read http response body")]
    ResponseBody(#[source] axum::Error),
}

impl EncodingError {
    /// HTTP status code the error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            EncodingError::BodyRead(_) => StatusCode::BAD_REQUEST,
            EncodingError::UnsupportedEncoding(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            EncodingError::Transform { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            EncodingError::ResponseBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The encoding token involved, if any.
    pub fn encoding(&self) -> Option<&str> {
        match self {
            EncodingError::UnsupportedEncoding(encoding) => Some(encoding),
            EncodingError::Transform { encoding, .. } => Some(encoding),
            _ => None,
        }
    }
}

impl From<ChainError> for EncodingError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::UnsupportedEncoding(encoding) => EncodingError::UnsupportedEncoding(encoding),
            ChainError::Transform { encoding, source } => EncodingError::Transform { encoding, source },
        }
    }
}

impl IntoResponse for EncodingError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(format!("{self}\n")));
        *response.status_mut() = self.status();

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );

        response
    }
}
