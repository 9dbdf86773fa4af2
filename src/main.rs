//! api-dispatch demo server.
//!
//! Serves the demo controllers over HTTP and WebSocket until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use api_dispatch::config::load_or_default;
use api_dispatch::lifecycle::signals::wait_for_signal;
use api_dispatch::observability::{logging, metrics};
use api_dispatch::{demo, start_app, App};

#[derive(Parser, Debug)]
#[command(name = "api-dispatch", version, about = "Controller dispatch server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    logging::init(&config.observability)?;
    tracing::info!("api-dispatch v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        allow_dynamic_routes = config.routing.allow_dynamic_routes,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Arc::new(App::new());
    demo::register(&app)?;

    let handle = start_app(app, config, |addr| {
        tracing::info!(address = %addr, "Server started");
    })
    .await?;

    wait_for_signal().await;
    handle.stop();
    handle.wait().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
