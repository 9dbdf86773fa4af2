//! Route and event harvesting from controller definitions.
//!
//! # Responsibilities
//! - List the HTTP-routable actions of a controller with their default paths
//! - Build the socket endpoint descriptor for a socket controller
//!
//! # Design Decisions
//! - Works on declared members only; value members are never routable
//! - Lifecycle members and `_`-prefixed members stay on the instance (the
//!   per-request facade still exposes them) but get no route or event
//! - Paths come from `routing::naming`: `TestEndpoint.exposedPrivate`
//!   becomes `/test-endpoint/exposed-private`

use std::fmt;
use std::sync::Arc;

use crate::controller::definition::{Action, ControllerInstance};
use crate::routing::naming::to_path_segment;

/// Names starting with this marker are private.
pub const PRIVATE_PREFIX: char = '_';

/// Members never exposed as HTTP actions.
pub const INTERNAL_ACTIONS: &[&str] = &["constructor", "onLoad"];

/// Members never exposed as socket events.
pub const INTERNAL_EVENTS: &[&str] = &["constructor", "open", "close", "error"];

/// A routable action with its default path.
pub struct HarvestedRoute<C> {
    pub path: String,
    pub member: String,
    pub action: Action<C>,
}

impl<C> fmt::Debug for HarvestedRoute<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestedRoute")
            .field("path", &self.path)
            .field("member", &self.member)
            .finish_non_exhaustive()
    }
}

/// One socket event bound to a controller member.
pub struct SocketEventHandler<C> {
    pub event: String,
    pub member: String,
    pub method: Action<C>,
}

/// Everything the engine needs to serve a socket controller.
pub struct SocketEndpoint<C> {
    path: String,
    controller: Arc<ControllerInstance<C>>,
    handlers: Vec<SocketEventHandler<C>>,
}

impl<C> SocketEndpoint<C> {
    /// Upgrade path, `/` + the controller's path segment.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn controller(&self) -> &Arc<ControllerInstance<C>> {
        &self.controller
    }

    /// Handlers in declaration order.
    pub fn handlers(&self) -> &[SocketEventHandler<C>] {
        &self.handlers
    }

    pub fn handler(&self, event: &str) -> Option<&SocketEventHandler<C>> {
        self.handlers.iter().find(|h| h.event == event)
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.event.as_str())
    }
}

impl<C> fmt::Debug for SocketEndpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketEndpoint")
            .field("path", &self.path)
            .field("controller", &self.controller.name())
            .field("events", &self.events().collect::<Vec<_>>())
            .finish()
    }
}

/// Whether a member name is hidden by the private-prefix convention.
pub fn is_private(name: &str) -> bool {
    name.starts_with(PRIVATE_PREFIX)
}

fn is_exposed(name: &str, internal: &[&str]) -> bool {
    !internal.contains(&name) && !is_private(name)
}

/// Default base path of a controller.
pub fn controller_path(controller: &str) -> String {
    format!("/{}", to_path_segment(controller))
}

/// HTTP-routable actions of `instance`, in declaration order.
pub fn harvest_http_routes<C>(instance: &ControllerInstance<C>) -> Vec<HarvestedRoute<C>> {
    let base = controller_path(instance.name());

    instance
        .definition()
        .members()
        .filter(|(name, _)| is_exposed(name, INTERNAL_ACTIONS))
        .filter_map(|(name, member)| {
            member.as_action().map(|action| HarvestedRoute {
                path: format!("{base}/{}", to_path_segment(name)),
                member: name.to_string(),
                action: action.clone(),
            })
        })
        .collect()
}

/// Socket endpoint for `instance`: one handler per exposed action.
pub fn harvest_socket_events<C>(instance: Arc<ControllerInstance<C>>) -> SocketEndpoint<C> {
    let handlers = instance
        .definition()
        .members()
        .filter(|(name, _)| is_exposed(name, INTERNAL_EVENTS))
        .filter_map(|(name, member)| {
            member.as_action().map(|method| SocketEventHandler {
                event: to_path_segment(name),
                member: name.to_string(),
                method: method.clone(),
            })
        })
        .collect();

    SocketEndpoint {
        path: controller_path(instance.name()),
        controller: instance,
        handlers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::definition::{ActionResult, Controller};
    use serde_json::json;

    fn ok(_: &mut ()) -> ActionResult {
        Ok(json!(null))
    }

    fn endpoint_controller() -> Arc<ControllerInstance<()>> {
        Controller::new("TestEndpoint")
            .action("constructor", ok)
            .action("onLoad", ok)
            .action("ping", ok)
            .action("_private", ok)
            .action("exposedPrivate", ok)
            .action("open", ok)
            .value("counter", 0)
            .instantiate()
    }

    #[test]
    fn test_http_routes_exclude_internal_and_private() {
        let instance = endpoint_controller();
        let routes = harvest_http_routes(&instance);

        let paths: Vec<_> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/test-endpoint/ping",
                "/test-endpoint/exposed-private",
                "/test-endpoint/open",
            ]
        );
        assert_eq!(routes[1].member, "exposedPrivate");

        // Hidden members are still on the instance.
        assert!(instance.action("_private").is_some());
        assert!(instance.action("onLoad").is_some());
    }

    #[test]
    fn test_socket_events_exclude_lifecycle() {
        let endpoint = harvest_socket_events(endpoint_controller());

        assert_eq!(endpoint.path(), "/test-endpoint");
        assert_eq!(
            endpoint.events().collect::<Vec<_>>(),
            ["on-load", "ping", "exposed-private"]
        );
        assert_eq!(endpoint.handler("exposed-private").unwrap().member, "exposedPrivate");
        assert!(endpoint.handler("open").is_none());
        assert!(endpoint.handler("_private").is_none());
    }

    #[test]
    fn test_private_prefix() {
        assert!(is_private("_hidden"));
        assert!(!is_private("visible_"));
        assert_eq!(controller_path("Test"), "/test");
    }
}
