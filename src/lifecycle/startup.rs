//! Startup orchestration.
//!
//! # Responsibilities
//! - Apply routing policy (drop the controller registry when dynamic routes
//!   are disabled)
//! - Bind the listener and start serving
//! - Hand back a handle to stop the app and await completion
//!
//! # Design Decisions
//! - Fail fast: a bind error is returned before anything is spawned
//! - The listen callback runs only after the socket is bound
//! - Controllers should be registered before `start_app`; later dynamic
//!   registration is allowed while the registry is kept

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::app::App;
use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;

/// Error type for startup failures.
#[derive(Debug)]
pub enum StartupError {
    Bind { address: String, source: io::Error },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Bind { address, source } => {
                write!(f, "Failed to bind {}: {}", address, source)
            }
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Bind { source, .. } => Some(source),
        }
    }
}

/// A running app.
#[derive(Debug)]
pub struct AppHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
}

impl AppHandle {
    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and let in-flight requests finish.
    pub fn stop(&self) {
        tracing::info!(address = %self.local_addr, "Stopping app");
        self.shutdown.trigger();
    }

    /// Wait until the server task exits.
    pub async fn wait(self) -> io::Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

/// Bind `config.listener`, start serving `app`, then call `on_listen`.
pub async fn start_app<F>(app: Arc<App>, config: AppConfig, on_listen: F) -> Result<AppHandle, StartupError>
where
    F: FnOnce(SocketAddr),
{
    if !config.routing.allow_dynamic_routes {
        app.drop_controller_registry();
    }

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        address: address.clone(),
        source,
    })?;

    tracing::info!(
        address = %local_addr,
        routes = app.routes().len(),
        dynamic_routes = app.dynamic_routing_enabled(),
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config, app);
    let task = tokio::spawn(server.run(listener, receiver));

    on_listen(local_addr);

    Ok(AppHandle {
        local_addr,
        shutdown,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.listener.host = "127.0.0.1".into();
        config.listener.port = 0;
        config
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let app = Arc::new(App::new());
        let mut announced = None;
        let handle = start_app(app.clone(), local_config(), |addr| announced = Some(addr))
            .await
            .unwrap();

        assert_eq!(announced, Some(handle.local_addr()));
        assert!(app.dynamic_routing_enabled());

        handle.stop();
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_registry_dropped_when_dynamic_routes_disabled() {
        let app = Arc::new(App::new());
        let mut config = local_config();
        config.routing.allow_dynamic_routes = false;

        let handle = start_app(app.clone(), config, |_| {}).await.unwrap();
        assert!(!app.dynamic_routing_enabled());

        handle.stop();
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = local_config();
        config.listener.port = taken.local_addr().unwrap().port();

        let result = start_app(Arc::new(App::new()), config, |_| {}).await;
        assert!(matches!(result, Err(StartupError::Bind { .. })));
    }
}
