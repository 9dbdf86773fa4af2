//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single dispatch fallback
//! - Wire up middleware (tracing, limits, request ID, timeout, CORS)
//! - Serve on a bound listener until the shutdown signal
//! - Dispatch requests: match route → build context → run action → write reply
//!
//! # Data Flow
//! ```text
//! request
//!     → upgrade to a socket endpoint? → websocket.rs
//!     → App::match_route (404 "API endpoint not found" on miss)
//!     → request.rs (body → data, metadata)
//!     → patch_context (owner controller)
//!     → action on the blocking pool
//!     → HttpContext::into_reply → response.rs
//! ```
//!
//! # Design Decisions
//! - Actions are synchronous and may block, so they run on `spawn_blocking`
//! - Action errors and panics become 500 responses; the server keeps serving
//! - Routes are matched on the path only; every method reaches the action
//! - Socket endpoints take precedence for upgrade requests; an upgrade to a
//!   path without one is dispatched like any other HTTP request

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::SERVER;
use axum::http::{HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::config::{AppConfig, CorsConfig};
use crate::context::HttpContext;
use crate::controller::patch_context;
use crate::http::{request, response, websocket};
use crate::observability::metrics;

const SERVER_NAME: &str = concat!("api-dispatch/", env!("CARGO_PKG_VERSION"));

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub max_body_size: usize,
}

/// HTTP server for an `App`.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig, app: Arc<App>) -> Self {
        let state = AppState {
            app,
            max_body_size: config.listener.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let router = Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(SetResponseHeaderLayer::if_not_present(
                SERVER,
                HeaderValue::from_static(SERVER_NAME),
            ))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let router = match cors_layer(&config.cors) {
            Some(cors) => router.layer(cors),
            None => router,
        };

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// CORS policy from config, or `None` when disabled.
fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let origin = match config.origin.as_str() {
        "" => AllowOrigin::mirror_request(),
        "*" => AllowOrigin::any(),
        exact => match HeaderValue::from_str(exact) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin = %exact, "Invalid CORS origin, mirroring request origin");
                AllowOrigin::mirror_request()
            }
        },
    };

    let methods: Vec<Method> = config
        .methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
        .collect();
    let headers: Vec<HeaderName> = config
        .headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(config.ttl_secs)),
    )
}

/// Single entry point for every request.
async fn dispatch_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    if websocket::is_upgrade_request(&parts.headers) {
        if let Some(endpoint) = state.app.socket_endpoint(&path) {
            return websocket::upgrade(endpoint, parts, peer, &state).await;
        }
    }

    let Some((route, params)) = state.app.match_route(&path) else {
        tracing::debug!(method = %parts.method, path = %path, "No route matched");
        metrics::record_request(404, metrics::UNMATCHED, start_time);
        return response::not_found();
    };

    let data = match request::read_body(body, &parts.headers, state.max_body_size).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Rejected request body");
            let response = e.into_response();
            metrics::record_request(response.status().as_u16(), route.pattern().as_str(), start_time);
            return response;
        }
    };

    let mut ctx = HttpContext::new(request::request_meta(&parts, peer), params, data);
    patch_context(&mut ctx, route.owner().cloned());

    let request_id = ctx.meta().request_id().unwrap_or("-").to_string();
    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %path,
        route = %route.pattern(),
        owner = route.owner().map(|o| o.name()).unwrap_or("-"),
        "Dispatching request"
    );

    let action = route.action().clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let result = action(&mut ctx);
        (ctx, result)
    })
    .await;

    let response = match outcome {
        Ok((ctx, Ok(value))) => match ctx.into_reply(value) {
            Ok(reply) => reply.into_response(),
            Err(e) => {
                tracing::error!(request_id = %request_id, path = %path, error = %e, "Failed to build response");
                response::internal_error(&e.to_string())
            }
        },
        Ok((_, Err(e))) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Action failed");
            response::internal_error(&e.to_string())
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Action panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), route.pattern().as_str(), start_time);
    response
}
