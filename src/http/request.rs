//! Request decoding.
//!
//! # Responsibilities
//! - Build the request metadata (id, peer address, headers, raw query)
//! - Read and decode the body into the context's `data`
//!
//! # Design Decisions
//! - JSON bodies must parse; a malformed body is rejected with 400
//! - urlencoded forms go through the query decoder
//! - Any other content type is kept as UTF-8 text; empty bodies are `None`

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::context::RequestMeta;
use crate::query;

/// Body decoding failures, each mapped to a client error.
#[derive(Debug)]
pub enum BodyError {
    TooLarge,
    InvalidJson(serde_json::Error),
    NotUtf8,
}

impl std::fmt::Display for BodyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyError::TooLarge => write!(f, "Request body too large"),
            BodyError::InvalidJson(e) => write!(f, "Invalid JSON body: {}", e),
            BodyError::NotUtf8 => write!(f, "Request body is not valid UTF-8"),
        }
    }
}

impl std::error::Error for BodyError {}

impl IntoResponse for BodyError {
    fn into_response(self) -> Response {
        let status = match self {
            BodyError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            BodyError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            BodyError::NotUtf8 => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        };
        (status, self.to_string()).into_response()
    }
}

/// Metadata for the request described by `parts`.
pub fn request_meta(parts: &Parts, peer: SocketAddr) -> RequestMeta {
    RequestMeta::new(
        parts.method.clone(),
        parts.uri.path(),
        peer.ip(),
        parts.headers.clone(),
        parts.uri.query().unwrap_or_default(),
    )
}

/// Read at most `limit` bytes of `body` and decode them by content type.
pub async fn read_body(
    body: Body,
    headers: &HeaderMap,
    limit: usize,
) -> Result<Option<serde_json::Value>, BodyError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| BodyError::TooLarge)?;
    decode_body(&bytes, headers)
}

/// Decode an already buffered body.
pub fn decode_body(bytes: &[u8], headers: &HeaderMap) -> Result<Option<serde_json::Value>, BodyError> {
    if bytes.is_empty() {
        return Ok(None);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        return serde_json::from_slice(bytes)
            .map(Some)
            .map_err(BodyError::InvalidJson);
    }

    let text = std::str::from_utf8(bytes).map_err(|_| BodyError::NotUtf8)?;
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return Ok(Some(query::decode_to_json(text)));
    }

    Ok(Some(serde_json::Value::String(text.to_string())))
}
