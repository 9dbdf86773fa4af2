//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use api_dispatch::config::AppConfig;
use api_dispatch::{demo, start_app, App, AppHandle};

/// Start the demo app on `127.0.0.1:port`.
pub async fn start_demo(port: u16) -> (Arc<App>, AppHandle) {
    start_configured(port, |_| {}).await
}

/// Start the demo app after adjusting the default config.
pub async fn start_configured<F>(port: u16, configure: F) -> (Arc<App>, AppHandle)
where
    F: FnOnce(&mut AppConfig),
{
    let mut config = AppConfig::default();
    config.listener.host = "127.0.0.1".to_string();
    config.listener.port = port;
    configure(&mut config);

    let app = Arc::new(App::new());
    demo::register(&app).unwrap();

    let handle = start_app(app.clone(), config, |_| {}).await.unwrap();
    (app, handle)
}

/// Serve an already populated `app` on `127.0.0.1:port`.
pub async fn serve(port: u16, app: Arc<App>) -> AppHandle {
    let mut config = AppConfig::default();
    config.listener.host = "127.0.0.1".to_string();
    config.listener.port = port;
    start_app(app, config, |_| {}).await.unwrap()
}

/// Client that neither pools connections nor follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", port, path)
}

/// GET `path` and return status and body text.
pub async fn get_text(port: u16, path: &str) -> (u16, String) {
    let response = client().get(url(port, path)).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

/// GET `path` and return status and JSON body.
pub async fn get_json(port: u16, path: &str) -> (u16, serde_json::Value) {
    let response = client().get(url(port, path)).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

pub async fn stop(handle: AppHandle) {
    handle.stop();
    handle.wait().await.unwrap();
}
