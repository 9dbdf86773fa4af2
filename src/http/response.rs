//! Response writing.
//!
//! # Responsibilities
//! - Turn an `HttpReply` into an axum response
//! - Build the fixed not-found and handler-failure responses
//!
//! # Design Decisions
//! - Unknown paths and hidden (private) actions get the identical 404
//! - A dropped reply gets a body stream that fails immediately, so the
//!   connection is aborted before a complete response is written

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream;

use crate::context::{HttpReply, ResponseBody};

/// Body of every 404.
pub const NOT_FOUND_MESSAGE: &str = "API endpoint not found";

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response()
}

/// 500 carrying the failure message as plain text.
pub fn internal_error(message: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string()).into_response()
}

fn aborted_body() -> Body {
    Body::from_stream(stream::once(async {
        Err::<Bytes, _>(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            "connection dropped by handler",
        ))
    }))
}

impl IntoResponse for HttpReply {
    fn into_response(self) -> Response {
        let body = match self.body {
            ResponseBody::Empty => Body::empty(),
            ResponseBody::Bytes(bytes) => Body::from(bytes),
            ResponseBody::Drop => aborted_body(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[tokio::test]
    async fn test_not_found_body() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], NOT_FOUND_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_reply_conversion() {
        let mut headers = HeaderMap::new();
        headers.insert("x-test", "1".parse().unwrap());
        let response = HttpReply {
            status: StatusCode::CREATED,
            headers,
            body: ResponseBody::Bytes(b"ok".to_vec()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-test"], "1");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_dropped_reply_body_fails() {
        let response = HttpReply {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Drop,
        }
        .into_response();

        assert!(axum::body::to_bytes(response.into_body(), 1024).await.is_err());
    }
}
