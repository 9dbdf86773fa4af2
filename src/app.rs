//! Application registry: routes, controllers and socket endpoints.
//!
//! # Responsibilities
//! - Register HTTP controllers (harvested routes + name registry entry)
//! - Register custom routes bound to a closure or a `Controller.action` reference
//! - Register socket controllers as endpoint descriptors
//! - Drop the controller name registry on demand
//! - Answer route and socket-endpoint lookups for the engine
//!
//! # Design Decisions
//! - Every registration compiles all its patterns before publishing any route,
//!   so a failing registration leaves the table untouched
//! - Registering a controller after the registry drop still publishes its
//!   routes; only the name entry is skipped
//! - Socket endpoints match on the exact upgrade path

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::context::{HttpContext, SocketContext};
use crate::controller::{
    harvest_http_routes, harvest_socket_events, Action, ActionResult, ControllerInstance,
    ControllerRegistry, HttpController, SocketController, SocketEndpoint,
};
use crate::error::{DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::routing::{PathParams, Route, RoutePattern, RouteTable};

/// Target of a custom route.
pub enum Handler {
    /// A free function with no owning controller.
    Action(Action<HttpContext>),
    /// `Controller.action` resolved through the controller name registry.
    Reference(String),
}

impl Handler {
    pub fn action<F>(action: F) -> Self
    where
        F: Fn(&mut HttpContext) -> ActionResult + Send + Sync + 'static,
    {
        Handler::Action(Arc::new(action))
    }
}

impl From<&str> for Handler {
    fn from(reference: &str) -> Self {
        Handler::Reference(reference.to_string())
    }
}

impl From<String> for Handler {
    fn from(reference: String) -> Self {
        Handler::Reference(reference)
    }
}

impl From<Action<HttpContext>> for Handler {
    fn from(action: Action<HttpContext>) -> Self {
        Handler::Action(action)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Action(_) => f.write_str("Action(..)"),
            Handler::Reference(reference) => f.debug_tuple("Reference").field(reference).finish(),
        }
    }
}

/// Routes, controllers and socket endpoints of one application.
pub struct App {
    routes: RouteTable<HttpContext>,
    controllers: ControllerRegistry<HttpContext>,
    sockets: ArcSwap<Vec<Arc<SocketEndpoint<SocketContext>>>>,
}

impl App {
    pub fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            controllers: ControllerRegistry::new(),
            sockets: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Instantiate `controller` and publish a route for each exposed action.
    pub fn register_http_controller(
        &self,
        controller: HttpController,
    ) -> DispatchResult<Arc<ControllerInstance<HttpContext>>> {
        let instance = controller.instantiate();

        let routes = harvest_http_routes(&instance)
            .into_iter()
            .map(|harvested| -> DispatchResult<Route<HttpContext>> {
                let pattern = RoutePattern::compile(&harvested.path)?;
                Ok(Route::new(pattern, Some(instance.clone()), harvested.action))
            })
            .collect::<DispatchResult<Vec<_>>>()?;

        let count = routes.len();
        for route in routes {
            self.routes.push(route);
        }

        match self.controllers.insert(instance.clone()) {
            Ok(()) => {}
            Err(DispatchError::DynamicRoutingDisabled) => {
                tracing::debug!(
                    controller = %instance.name(),
                    "Controller registry dropped, name not recorded"
                );
            }
            Err(err) => return Err(err),
        }

        metrics::record_routes_registered(self.routes.len());
        tracing::info!(
            controller = %instance.name(),
            routes = count,
            "HTTP controller registered"
        );
        Ok(instance)
    }

    /// Register a custom route.
    ///
    /// ```ignore
    /// app.register_route("/test-custom/h{hash}.json", "TestEndpoint.hash")?;
    /// app.register_route("/health", Handler::action(|_| Ok(json!("ok"))))?;
    /// ```
    pub fn register_route(&self, pattern: &str, handler: impl Into<Handler>) -> DispatchResult<()> {
        match handler.into() {
            Handler::Action(action) => self.register_static(pattern, None, action),
            Handler::Reference(reference) => self.register_dynamic(pattern, &reference),
        }
    }

    /// Publish a route directly.
    pub fn register_static(
        &self,
        pattern: &str,
        owner: Option<Arc<ControllerInstance<HttpContext>>>,
        action: Action<HttpContext>,
    ) -> DispatchResult<()> {
        let compiled = RoutePattern::compile(pattern)?;
        let total = self.routes.push(Route::new(compiled, owner, action));
        metrics::record_routes_registered(total);
        Ok(())
    }

    /// Publish a route bound to `Controller.action`.
    pub fn register_dynamic(&self, pattern: &str, reference: &str) -> DispatchResult<()> {
        let (owner, action) = match self.controllers.resolve(reference) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(pattern = %pattern, reference = %reference, error = %err, "Dynamic route rejected");
                return Err(err);
            }
        };

        self.register_static(pattern, Some(owner), action)?;
        tracing::info!(pattern = %pattern, reference = %reference, "Dynamic route registered");
        Ok(())
    }

    /// Instantiate a socket controller and publish its endpoint.
    pub fn register_socket_controller(
        &self,
        controller: SocketController,
    ) -> Arc<SocketEndpoint<SocketContext>> {
        let endpoint = Arc::new(harvest_socket_events(controller.instantiate()));
        self.sockets.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(endpoint.clone());
            next
        });

        tracing::info!(
            controller = %endpoint.controller().name(),
            path = %endpoint.path(),
            events = endpoint.handlers().len(),
            "Socket controller registered"
        );
        endpoint
    }

    /// Release the controller name registry. Dynamic routes fail afterwards.
    pub fn drop_controller_registry(&self) {
        self.controllers.drop_all();
    }

    pub fn dynamic_routing_enabled(&self) -> bool {
        !self.controllers.is_dropped()
    }

    pub fn routes(&self) -> &RouteTable<HttpContext> {
        &self.routes
    }

    pub fn controllers(&self) -> &ControllerRegistry<HttpContext> {
        &self.controllers
    }

    /// First route matching `path`.
    pub fn match_route(&self, path: &str) -> Option<(Arc<Route<HttpContext>>, PathParams)> {
        self.routes.match_path(path)
    }

    /// Socket endpoint registered at exactly `path`.
    pub fn socket_endpoint(&self, path: &str) -> Option<Arc<SocketEndpoint<SocketContext>>> {
        self.sockets
            .load()
            .iter()
            .find(|endpoint| endpoint.path() == path)
            .cloned()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.routes.patterns())
            .field("controllers", &self.controllers.names())
            .field("sockets", &self.sockets.load().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::error::PatternError;
    use serde_json::json;

    fn endpoint() -> HttpController {
        Controller::new("TestEndpoint")
            .action("ping", |_| Ok(json!("pong")))
            .action("hash", |ctx: &mut HttpContext| Ok(json!(ctx.param("hash"))))
            .action("_private", |_| Ok(json!("private")))
            .action("onLoad", |_| Ok(json!(null)))
    }

    #[test]
    fn test_controller_routes_published() {
        let app = App::new();
        let instance = app.register_http_controller(endpoint()).unwrap();

        assert_eq!(
            app.routes().patterns(),
            vec!["/test-endpoint/ping", "/test-endpoint/hash"]
        );
        let (route, _) = app.match_route("/test-endpoint/ping").unwrap();
        assert!(Arc::ptr_eq(route.owner().unwrap(), &instance));
        assert!(app.match_route("/test-endpoint/_private").is_none());
        assert!(app.match_route("/test-endpoint/on-load").is_none());
    }

    #[test]
    fn test_dynamic_route_by_reference() {
        let app = App::new();
        app.register_http_controller(endpoint()).unwrap();
        app.register_route("/test-custom/h{hash}.json", "TestEndpoint.hash")
            .unwrap();

        let (route, params) = app.match_route("/test-custom/h9f3a.json").unwrap();
        assert_eq!(route.owner().unwrap().name(), "TestEndpoint");
        assert_eq!(params["hash"], "9f3a");
        assert!(app.match_route("/test-custom/9f3a.json").is_none());
    }

    #[test]
    fn test_dynamic_route_errors() {
        let app = App::new();
        app.register_http_controller(endpoint()).unwrap();

        assert_eq!(
            app.register_route("/x", "Nope.ping"),
            Err(DispatchError::ControllerNotRegistered("Nope".into()))
        );
        assert_eq!(
            app.register_route("/x", "TestEndpoint.missing"),
            Err(DispatchError::ActionNotFound {
                controller: "TestEndpoint".into(),
                action: "missing".into(),
            })
        );
        assert!(matches!(
            app.register_route("/{a}/{a}", "TestEndpoint.ping"),
            Err(DispatchError::Pattern(PatternError::DuplicateCapture { .. }))
        ));
        assert_eq!(app.routes().len(), 2);
    }

    #[test]
    fn test_drop_keeps_static_routes() {
        let app = App::new();
        app.register_http_controller(endpoint()).unwrap();
        app.register_route("/free", Handler::action(|_| Ok(json!("free"))))
            .unwrap();
        app.drop_controller_registry();

        assert!(!app.dynamic_routing_enabled());
        assert_eq!(
            app.register_route("/late", "TestEndpoint.ping"),
            Err(DispatchError::DynamicRoutingDisabled)
        );
        assert!(app.match_route("/test-endpoint/ping").is_some());
        assert!(app.match_route("/free").is_some());
        assert!(app.match_route("/late").is_none());

        // Controllers registered after the drop still get their routes.
        app.register_http_controller(Controller::new("Late").action("ping", |_| Ok(json!(1))))
            .unwrap();
        assert!(app.match_route("/late/ping").is_some());
        assert!(app.controllers().is_empty());
    }

    #[test]
    fn test_socket_endpoints() {
        let app = App::new();
        let endpoint = app.register_socket_controller(
            Controller::new("Chat")
                .action("open", |_| Ok(json!(null)))
                .action("sendMessage", |_| Ok(json!(null))),
        );

        assert_eq!(endpoint.path(), "/chat");
        assert_eq!(endpoint.events().collect::<Vec<_>>(), ["send-message"]);
        assert!(app.socket_endpoint("/chat").is_some());
        assert!(app.socket_endpoint("/chat/x").is_none());
    }
}
