//! Execution contexts.
//!
//! # Data Flow
//! ```text
//! engine request
//!     → RequestMeta (id, address, headers, raw query)
//!     → HttpContext (params, body data, response state)   http.rs
//!     → SocketContext (current frame, outbox)             socket.rs
//!     → action(&mut ctx)
//! ```
//!
//! # Design Decisions
//! - One context per request (HTTP) or per connection (socket); never shared
//! - The query string is decoded on first access and cached
//! - The controller facade lives in a `FacadeSlot` owned by the context

pub mod http;
pub mod socket;

use std::cell::OnceCell;
use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use serde::Serialize;
use uuid::Uuid;

use crate::controller::facade::{ControllerFacade, FacadeError, FacadeSlot};
use crate::query::{self, Query};

pub use http::{ContextError, HttpContext, HttpReply, PurePayload, ResponseBody};
pub use socket::SocketContext;

/// Header carrying the correlation id set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Behaviour shared by every context an action can run against.
pub trait ExecutionContext: Sized {
    /// Unique id of this request or connection.
    fn context_id(&self) -> Uuid;

    fn facade_slot(&self) -> &FacadeSlot<Self>;

    fn facade_slot_mut(&mut self) -> &mut FacadeSlot<Self>;

    /// The owning controller's facade, built on first access.
    fn controller(&self) -> Result<Arc<ControllerFacade<Self>>, FacadeError> {
        self.facade_slot().get_or_build(self.context_id())
    }
}

/// Remote peer address as exposed to actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientAddress {
    /// 4 or 6.
    pub version: u8,
    pub value: IpAddr,
}

impl From<IpAddr> for ClientAddress {
    fn from(ip: IpAddr) -> Self {
        let value = ip.to_canonical();
        let version = if value.is_ipv4() { 4 } else { 6 };
        Self { version, value }
    }
}

/// Request data common to HTTP and socket contexts.
#[derive(Debug)]
pub struct RequestMeta {
    id: Uuid,
    method: Method,
    path: String,
    address: ClientAddress,
    headers: HeaderMap,
    raw_query: String,
    query: OnceCell<Query>,
}

impl RequestMeta {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        address: IpAddr,
        headers: HeaderMap,
        raw_query: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            address: address.into(),
            headers,
            raw_query: raw_query.into(),
            query: OnceCell::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Correlation id from the `x-request-id` header, if present.
    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn address(&self) -> ClientAddress {
        self.address
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request header by case-insensitive name. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// Decoded query, computed once.
    pub fn query(&self) -> &Query {
        self.query.get_or_init(|| query::decode(&self.raw_query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_address_versions() {
        let v4 = ClientAddress::from(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(v4.version, 4);

        let v6 = ClientAddress::from(IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(v6.version, 6);

        // v4-mapped v6 peers are reported as v4.
        let mapped = ClientAddress::from(IpAddr::V6(Ipv4Addr::new(127, 0, 0, 1).to_ipv6_mapped()));
        assert_eq!(mapped.version, 4);
        assert_eq!(mapped.value, IpAddr::V4(Ipv4Addr::LOCALHOST));

        assert_eq!(
            serde_json::to_value(v4).unwrap(),
            serde_json::json!({ "version": 4, "value": "10.0.0.1" })
        );
    }

    #[test]
    fn test_meta_headers_and_query() {
        let mut headers = HeaderMap::new();
        headers.insert("Host", "example.test".parse().unwrap());
        headers.insert(X_REQUEST_ID, "abc-123".parse().unwrap());

        let meta = RequestMeta::new(
            Method::GET,
            "/test-endpoint/get",
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            headers,
            "a=b&flag",
        );

        assert_eq!(meta.header("host"), Some("example.test"));
        assert_eq!(meta.request_id(), Some("abc-123"));
        assert_eq!(meta.header("missing"), None);
        assert_eq!(meta.query()["a"].as_str(), Some("b"));
        assert_eq!(meta.query()["flag"].as_bool(), Some(true));
        // Cached: same allocation on second access.
        assert!(std::ptr::eq(meta.query(), meta.query()));
    }
}
