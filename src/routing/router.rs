//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route whose pattern matches a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Append-only: a registration publishes a new snapshot atomically (arc-swap),
//!   readers never lock and never observe a half-inserted route
//! - O(n) scan in registration order; earlier routes shadow later ones
//! - Duplicate patterns are stored, not replaced

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::controller::{Action, ControllerInstance};
use crate::routing::pattern::{PathParams, RoutePattern};

/// A pattern bound to a handler and, optionally, the controller that owns it.
pub struct Route<C> {
    pattern: RoutePattern,
    owner: Option<Arc<ControllerInstance<C>>>,
    action: Action<C>,
}

impl<C> Route<C> {
    pub fn new(
        pattern: RoutePattern,
        owner: Option<Arc<ControllerInstance<C>>>,
        action: Action<C>,
    ) -> Self {
        Self {
            pattern,
            owner,
            action,
        }
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// The controller singleton this route's handler belongs to.
    pub fn owner(&self) -> Option<&Arc<ControllerInstance<C>>> {
        self.owner.as_ref()
    }

    pub fn action(&self) -> &Action<C> {
        &self.action
    }
}

impl<C> fmt::Debug for Route<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("owner", &self.owner.as_ref().map(|o| o.name()))
            .finish_non_exhaustive()
    }
}

/// Process-wide routing table.
pub struct RouteTable<C> {
    routes: ArcSwap<Vec<Arc<Route<C>>>>,
}

impl<C> RouteTable<C> {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append a route. Returns the table size after insertion.
    pub fn push(&self, route: Route<C>) -> usize {
        let route = Arc::new(route);
        let previous = self.routes.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(route.clone());
            next
        });

        tracing::debug!(
            pattern = %route.pattern,
            owner = route.owner.as_ref().map(|o| o.name()).unwrap_or("-"),
            "Route registered"
        );
        previous.len() + 1
    }

    /// Find the first registered route matching `path`.
    pub fn match_path(&self, path: &str) -> Option<(Arc<Route<C>>, PathParams)> {
        let routes = self.routes.load();
        routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| (route.clone(), params)))
    }

    /// Patterns in registration (priority) order.
    pub fn patterns(&self) -> Vec<String> {
        self.routes
            .load()
            .iter()
            .map(|route| route.pattern.as_str().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every route. Only meant for test isolation.
    pub fn reset(&self) {
        self.routes.store(Arc::new(Vec::new()));
    }
}

impl<C> Default for RouteTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
