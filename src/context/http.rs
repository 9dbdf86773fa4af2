//! HTTP execution context.
//!
//! # Responsibilities
//! - Carry request data (metadata, path params, decoded body)
//! - Collect the response an action builds: status, headers, body
//! - Turn the action's outcome into an `HttpReply` for the engine
//!
//! # Design Decisions
//! - `send`, `send_pure`, `redirect` and `drop_connection` each replace the
//!   pending body; the last call wins
//! - When no explicit body was set, the action's return value is sent as JSON
//! - Status codes are validated when set, not when written

use std::net::IpAddr;

use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::context::{ClientAddress, ExecutionContext, RequestMeta};
use crate::controller::facade::FacadeSlot;
use crate::query::Query;
use crate::routing::PathParams;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";
const BINARY: &str = "application/octet-stream";

/// Errors raised by response operations.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid HTTP status code {0}")]
    InvalidStatus(u16),

    #[error("invalid header \"{name}\"")]
    InvalidHeader { name: String },

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raw payload for `send_pure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurePayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<String> for PurePayload {
    fn from(text: String) -> Self {
        PurePayload::Text(text)
    }
}

impl From<&str> for PurePayload {
    fn from(text: &str) -> Self {
        PurePayload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for PurePayload {
    fn from(bytes: Vec<u8>) -> Self {
        PurePayload::Bytes(bytes)
    }
}

impl From<&[u8]> for PurePayload {
    fn from(bytes: &[u8]) -> Self {
        PurePayload::Bytes(bytes.to_vec())
    }
}

/// Body of a finished response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,
    Bytes(Vec<u8>),
    /// Abandon the connection without a complete response.
    Drop,
}

/// What the engine writes back for one request.
#[derive(Debug)]
pub struct HttpReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Per-request context handed to HTTP actions.
#[derive(Debug)]
pub struct HttpContext {
    meta: RequestMeta,
    params: PathParams,
    data: Option<serde_json::Value>,
    status: StatusCode,
    headers: HeaderMap,
    body: Option<ResponseBody>,
    facade: FacadeSlot<HttpContext>,
}

impl HttpContext {
    pub fn new(meta: RequestMeta, params: PathParams, data: Option<serde_json::Value>) -> Self {
        Self {
            meta,
            params,
            data,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            facade: FacadeSlot::empty(),
        }
    }

    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    pub fn id(&self) -> Uuid {
        self.meta.id()
    }

    pub fn method(&self) -> &Method {
        self.meta.method()
    }

    pub fn path(&self) -> &str {
        self.meta.path()
    }

    pub fn address(&self) -> ClientAddress {
        self.meta.address()
    }

    pub fn ip(&self) -> IpAddr {
        self.meta.address().value
    }

    /// Request header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.meta.header(name)
    }

    pub fn query(&self) -> &Query {
        self.meta.query()
    }

    /// Values captured by the route pattern.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Decoded request body, if any.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, code: u16) -> Result<(), ContextError> {
        self.status = StatusCode::from_u16(code).map_err(|_| ContextError::InvalidStatus(code))?;
        Ok(())
    }

    /// Set a response header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ContextError> {
        let invalid = || ContextError::InvalidHeader {
            name: name.to_string(),
        };
        let header = HeaderName::try_from(name).map_err(|_| invalid())?;
        let value = HeaderValue::try_from(value).map_err(|_| invalid())?;
        self.headers.insert(header, value);
        Ok(())
    }

    /// Remove a response header. Returns true if it was set.
    pub fn remove_header(&mut self, name: &str) -> bool {
        self.headers.remove(name).is_some()
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Send `data` as JSON, optionally with a status code.
    pub fn send<T: Serialize + ?Sized>(&mut self, data: &T, code: Option<u16>) -> Result<(), ContextError> {
        let bytes = serde_json::to_vec(data)?;
        self.respond(bytes, JSON, code)
    }

    /// Send text or bytes without JSON encoding.
    pub fn send_pure(&mut self, payload: impl Into<PurePayload>, code: Option<u16>) -> Result<(), ContextError> {
        match payload.into() {
            PurePayload::Text(text) => self.respond(text.into_bytes(), TEXT, code),
            PurePayload::Bytes(bytes) => self.respond(bytes, BINARY, code),
        }
    }

    /// Answer with `302 Found` pointing at `url`.
    pub fn redirect(&mut self, url: &str) -> Result<(), ContextError> {
        let location = HeaderValue::try_from(url).map_err(|_| ContextError::InvalidHeader {
            name: LOCATION.to_string(),
        })?;
        self.headers.insert(LOCATION, location);
        self.status = StatusCode::FOUND;
        self.body = Some(ResponseBody::Empty);
        Ok(())
    }

    /// Abandon the connection; the client receives no complete response.
    pub fn drop_connection(&mut self) {
        self.body = Some(ResponseBody::Drop);
    }

    /// True once an explicit response operation ran.
    pub fn is_sent(&self) -> bool {
        self.body.is_some()
    }

    fn respond(&mut self, bytes: Vec<u8>, content_type: &'static str, code: Option<u16>) -> Result<(), ContextError> {
        if let Some(code) = code {
            self.set_status(code)?;
        }
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        self.body = Some(ResponseBody::Bytes(bytes));
        Ok(())
    }

    /// Finish the request. `returned` is used only when nothing was sent.
    pub fn into_reply(mut self, returned: serde_json::Value) -> Result<HttpReply, ContextError> {
        if self.body.is_none() {
            self.send(&returned, None)?;
        }

        Ok(HttpReply {
            status: self.status,
            headers: self.headers,
            body: self.body.unwrap_or(ResponseBody::Empty),
        })
    }
}

impl ExecutionContext for HttpContext {
    fn context_id(&self) -> Uuid {
        self.meta.id()
    }

    fn facade_slot(&self) -> &FacadeSlot<Self> {
        &self.facade
    }

    fn facade_slot_mut(&mut self) -> &mut FacadeSlot<Self> {
        &mut self.facade
    }
}
