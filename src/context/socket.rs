//! Socket execution context.
//!
//! One context lives for the whole connection. Each inbound frame replaces the
//! current event and payload before its handler runs. Replies are queued and
//! flushed by the engine after the handler returns.

use std::net::IpAddr;

use serde::Serialize;
use uuid::Uuid;

use crate::context::{ClientAddress, ExecutionContext, RequestMeta};
use crate::controller::facade::FacadeSlot;
use crate::query::Query;

/// Separator between event name and payload in a text frame.
pub const EVENT_SEPARATOR: char = ':';

/// Split an `event:payload` frame. A frame without separator is an event
/// with an empty payload.
pub fn split_frame(frame: &str) -> (&str, &str) {
    frame.split_once(EVENT_SEPARATOR).unwrap_or((frame, ""))
}

/// Encode an outbound `event:payload` frame.
pub fn encode_frame(event: &str, payload: &str) -> String {
    format!("{event}{EVENT_SEPARATOR}{payload}")
}

/// Per-connection context handed to socket event handlers.
#[derive(Debug)]
pub struct SocketContext {
    meta: RequestMeta,
    event: String,
    payload: String,
    outbox: Vec<String>,
    closing: bool,
    facade: FacadeSlot<SocketContext>,
}

impl SocketContext {
    pub fn new(meta: RequestMeta) -> Self {
        Self {
            meta,
            event: String::new(),
            payload: String::new(),
            outbox: Vec::new(),
            closing: false,
            facade: FacadeSlot::empty(),
        }
    }

    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    pub fn id(&self) -> Uuid {
        self.meta.id()
    }

    pub fn address(&self) -> ClientAddress {
        self.meta.address()
    }

    pub fn ip(&self) -> IpAddr {
        self.meta.address().value
    }

    /// Header of the upgrade request.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.meta.header(name)
    }

    /// Query of the upgrade request.
    pub fn query(&self) -> &Query {
        self.meta.query()
    }

    /// Event name of the frame being handled.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Payload of the frame being handled.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Payload parsed as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }

    pub(crate) fn set_frame(&mut self, event: &str, payload: &str) {
        self.event.clear();
        self.event.push_str(event);
        self.payload.clear();
        self.payload.push_str(payload);
    }

    /// Queue a text frame `event:text`.
    pub fn emit_text(&mut self, event: &str, text: &str) {
        self.outbox.push(encode_frame(event, text));
    }

    /// Queue a frame whose payload is `data` as JSON. Strings are sent as-is.
    pub fn emit<T: Serialize + ?Sized>(&mut self, event: &str, data: &T) -> Result<(), serde_json::Error> {
        let payload = match serde_json::to_value(data)? {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        };
        self.outbox.push(encode_frame(event, &payload));
        Ok(())
    }

    /// Close the connection after pending frames are flushed.
    pub fn close(&mut self) {
        self.closing = true;
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }
}

impl ExecutionContext for SocketContext {
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
