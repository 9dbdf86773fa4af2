//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (host, port, body limit).
    pub listener: ListenerConfig,

    /// Route registration settings.
    pub routing: RoutingConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port. `PORT` in the environment overrides it.
    pub port: u16,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl ListenerConfig {
    /// `host:port`, ready for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Route registration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Keep the controller name registry after startup so routes can be
    /// registered by `Controller.action` reference. When false the registry
    /// is dropped before the server accepts traffic.
    pub allow_dynamic_routes: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            allow_dynamic_routes: true,
        }
    }
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,

    /// Allowed origin. Empty mirrors the request `Origin`; `*` allows any.
    pub origin: String,

    /// Allowed methods.
    pub methods: Vec<String>,

    /// Allowed request headers.
    pub headers: Vec<String>,

    /// Preflight cache lifetime.
    pub ttl_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            origin: String::new(),
            methods: vec!["GET".to_string(), "POST".to_string()],
            headers: vec!["content-type".to_string(), "session".to_string()],
            ttl_secs: 86_400,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Level used when `RUST_LOG` is unset (e.g., "info").
    pub log_level: String,

    pub log_format: LogFormat,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8081");
        assert!(config.routing.allow_dynamic_routes);
        assert_eq!(config.cors.methods, ["GET", "POST"]);
        assert_eq!(config.cors.ttl_secs, 86_400);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [listener]
            port = 9000

            [routing]
            allow_dynamic_routes = false

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert!(!config.routing.allow_dynamic_routes);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.timeouts.request_secs, 30);
    }
}
