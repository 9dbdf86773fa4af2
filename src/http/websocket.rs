//! WebSocket endpoint handling.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests
//! - Complete the handshake for registered socket endpoints
//! - Route `event:payload` text frames to controller event handlers
//! - Run the `open`, `close` and `error` lifecycle members
//!
//! # Data Flow
//! ```text
//! Client ──── "event:payload" ───→ handler(&mut SocketContext)
//!        ←─── queued emits ─────── outbox flushed after each handler
//! ```
//!
//! # Design Decisions
//! - One `SocketContext` per connection; its facade lives as long as the socket
//! - Handlers are synchronous and may block, so every handler and lifecycle
//!   member runs on the blocking pool with the context moved in and out
//! - A panicking handler is answered with `error:Internal server error`; the
//!   connection stays open
//! - Unknown events are answered with `error:Event <name> not defined`
//! - A handler's non-null return value is emitted under the same event name
//! - Ping/pong handled transparently by axum; binary frames are ignored

use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::header::{CONNECTION, UPGRADE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::context::socket::split_frame;
use crate::context::{RequestMeta, SocketContext};
use crate::controller::{patch_context, SocketEndpoint};
use crate::http::request::request_meta;
use crate::observability::metrics;

/// Event name used for error replies.
pub const ERROR_EVENT: &str = "error";

const PANIC_MESSAGE: &str = "Internal server error";

type Endpoint = SocketEndpoint<SocketContext>;

/// True when the request asks for a WebSocket upgrade.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    let connection = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("upgrade")));
    upgrade && connection
}

/// Complete the handshake and serve `endpoint` on the upgraded connection.
pub async fn upgrade<S: Send + Sync>(
    endpoint: Arc<Endpoint>,
    mut parts: Parts,
    peer: SocketAddr,
    state: &S,
) -> Response {
    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, state).await {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let meta = request_meta(&parts, peer);
    ws.on_upgrade(move |socket| serve_socket(socket, endpoint, meta))
}

async fn serve_socket(mut socket: WebSocket, endpoint: Arc<Endpoint>, meta: RequestMeta) {
    let mut ctx = SocketContext::new(meta);
    patch_context(&mut ctx, Some(endpoint.controller().clone()));
    let connection_id = ctx.id();

    tracing::info!(
        connection_id = %connection_id,
        path = %endpoint.path(),
        peer = %ctx.ip(),
        "Socket connected"
    );

    let Some(mut ctx) = run_step(&endpoint, ctx, |endpoint, ctx| run_lifecycle(endpoint, "open", ctx)).await
    else {
        return;
    };

    if flush(&mut socket, &mut ctx).await.is_ok() {
        while !ctx.is_closing() {
            let Some(message) = socket.recv().await else {
                break;
            };

            match message {
                Ok(Message::Text(text)) => {
                    let frame = text.as_str().to_string();
                    let Some(next) =
                        run_step(&endpoint, ctx, move |endpoint, ctx| handle_frame(endpoint, ctx, &frame)).await
                    else {
                        return;
                    };
                    ctx = next;
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        code = frame.as_ref().map(|f| f.code),
                        "Close frame received"
                    );
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Socket stream error");
                    let reason = e.to_string();
                    let Some(next) =
                        run_step(&endpoint, ctx, move |endpoint, ctx| on_stream_error(endpoint, ctx, &reason)).await
                    else {
                        return;
                    };
                    ctx = next;
                    let _ = flush(&mut socket, &mut ctx).await;
                    break;
                }
            }

            if flush(&mut socket, &mut ctx).await.is_err() {
                break;
            }
        }

        if ctx.is_closing() {
            let _ = socket.send(Message::Close(None)).await;
        }
    }

    let _ = run_step(&endpoint, ctx, |endpoint, ctx| run_lifecycle(endpoint, "close", ctx)).await;
    tracing::info!(connection_id = %connection_id, "Socket disconnected");
}

/// Run `step` against `ctx` on the blocking pool and hand the context back.
///
/// Returns `None` only when the blocking task could not complete, which ends
/// the connection.
async fn run_step<F>(endpoint: &Arc<Endpoint>, mut ctx: SocketContext, step: F) -> Option<SocketContext>
where
    F: FnOnce(&Endpoint, &mut SocketContext) + Send + 'static,
{
    let endpoint = endpoint.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(|| step(&*endpoint, &mut ctx)));
        if result.is_err() {
            tracing::error!(connection_id = %ctx.id(), event = %ctx.event(), "Socket handler panicked");
            ctx.emit_text(ERROR_EVENT, PANIC_MESSAGE);
        }
        ctx
    })
    .await;

    match outcome {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            tracing::error!(error = %e, "Socket handler task failed");
            None
        }
    }
}

fn handle_frame(endpoint: &Endpoint, ctx: &mut SocketContext, frame: &str) {
    let (event, payload) = split_frame(frame);
    metrics::record_socket_message(event);

    let Some(handler) = endpoint.handler(event) else {
        tracing::debug!(connection_id = %ctx.id(), event = %event, "Unknown socket event");
        ctx.emit_text(ERROR_EVENT, &format!("Event {event} not defined"));
        return;
    };

    ctx.set_frame(event, payload);
    match (handler.method)(ctx) {
        Ok(serde_json::Value::Null) => {}
        Ok(value) => {
            if let Err(e) = ctx.emit(event, &value) {
                tracing::warn!(event = %event, error = %e, "Failed to encode socket reply");
            }
        }
        Err(e) => {
            tracing::warn!(
                connection_id = %ctx.id(),
                event = %event,
                member = %handler.member,
                error = %e,
                "Socket handler failed"
            );
            ctx.emit_text(ERROR_EVENT, &e.to_string());
        }
    }
}

/// Expose a stream failure to the `error` member as an `error:<reason>` frame.
fn on_stream_error(endpoint: &Endpoint, ctx: &mut SocketContext, reason: &str) {
    ctx.set_frame(ERROR_EVENT, reason);
    run_lifecycle(endpoint, ERROR_EVENT, ctx);
}

/// Run a lifecycle member if the controller declares it.
fn run_lifecycle(endpoint: &Endpoint, member: &str, ctx: &mut SocketContext) {
    let Some(action) = endpoint.controller().action(member) else {
        return;
    };

    if let Err(e) = action(ctx) {
        tracing::warn!(connection_id = %ctx.id(), member = %member, error = %e, "Lifecycle member failed");
    }
}

async fn flush(socket: &mut WebSocket, ctx: &mut SocketContext) -> Result<(), axum::Error> {
    for frame in ctx.take_outbox() {
        socket.send(Message::Text(frame.into())).await?;
    }
    Ok(())
}
