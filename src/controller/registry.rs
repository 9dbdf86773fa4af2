//! Controller name registry.
//!
//! # Responsibilities
//! - Map controller names to their singleton instances
//! - Resolve `Controller.action` references for dynamic route registration
//! - Support an irreversible drop that disables dynamic registration
//!
//! # State Machine
//! ```text
//! Active(names → instances) ──drop()──▶ Dropped
//! ```
//!
//! # Design Decisions
//! - State is published through arc-swap; lookups never block registration
//! - `Dropped` is terminal: inserts are refused and lookups fail with
//!   `DynamicRoutingDisabled`
//! - Re-registering a name overwrites the previous instance

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::controller::definition::{Action, ControllerInstance};
use crate::error::{DispatchError, DispatchResult};

enum RegistryState<C> {
    Active(HashMap<String, Arc<ControllerInstance<C>>>),
    Dropped,
}

/// Name → instance table used by dynamic route registration.
pub struct ControllerRegistry<C> {
    state: ArcSwap<RegistryState<C>>,
}

impl<C> ControllerRegistry<C> {
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(RegistryState::Active(HashMap::new())),
        }
    }

    /// Record `instance` under its name.
    ///
    /// Fails with `DynamicRoutingDisabled` once the registry has been dropped.
    pub fn insert(&self, instance: Arc<ControllerInstance<C>>) -> DispatchResult<()> {
        let name = instance.name().to_string();
        let previous = self.state.rcu(|state| match &**state {
            RegistryState::Active(names) => {
                let mut next = names.clone();
                next.insert(name.clone(), instance.clone());
                RegistryState::Active(next)
            }
            RegistryState::Dropped => RegistryState::Dropped,
        });

        match &*previous {
            RegistryState::Active(names) => {
                if names.contains_key(&name) {
                    tracing::debug!(controller = %name, "Controller instance replaced");
                }
                Ok(())
            }
            RegistryState::Dropped => Err(DispatchError::DynamicRoutingDisabled),
        }
    }

    /// Look up a controller by name.
    pub fn get(&self, name: &str) -> DispatchResult<Arc<ControllerInstance<C>>> {
        match &**self.state.load() {
            RegistryState::Active(names) => names
                .get(name)
                .cloned()
                .ok_or_else(|| DispatchError::ControllerNotRegistered(name.to_string())),
            RegistryState::Dropped => Err(DispatchError::DynamicRoutingDisabled),
        }
    }

    /// Resolve a `Controller.action` reference.
    ///
    /// Only the first `.` separates the two names. A value member is not an
    /// action and resolves to `ActionNotFound`.
    pub fn resolve(
        &self,
        reference: &str,
    ) -> DispatchResult<(Arc<ControllerInstance<C>>, Action<C>)> {
        let (controller, action) = reference.split_once('.').unwrap_or((reference, ""));
        let instance = self.get(controller)?;

        let action = instance
            .action(action)
            .cloned()
            .ok_or_else(|| DispatchError::ActionNotFound {
                controller: controller.to_string(),
                action: action.to_string(),
            })?;

        Ok((instance, action))
    }

    /// Forget every controller and refuse all further use.
    ///
    /// Returns the number of controllers released. Calling it again is a no-op.
    pub fn drop_all(&self) -> usize {
        let previous = self.state.swap(Arc::new(RegistryState::Dropped));
        match &*previous {
            RegistryState::Active(names) => {
                tracing::info!(released = names.len(), "Controller registry dropped");
                names.len()
            }
            RegistryState::Dropped => 0,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(**self.state.load(), RegistryState::Dropped)
    }

    /// Registered controller names, sorted. Empty once dropped.
    pub fn names(&self) -> Vec<String> {
        match &**self.state.load() {
            RegistryState::Active(names) => {
                let mut list: Vec<_> = names.keys().cloned().collect();
                list.sort();
                list
            }
            RegistryState::Dropped => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match &**self.state.load() {
            RegistryState::Active(names) => names.len(),
            RegistryState::Dropped => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> Default for ControllerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::definition::Controller;
    use serde_json::json;

    fn endpoint() -> Arc<ControllerInstance<()>> {
        Controller::new("TestEndpoint")
            .action("hash", |_: &mut ()| Ok(json!("hash")))
            .action("_private", |_: &mut ()| Ok(json!("private")))
            .value("counter", 0)
            .instantiate()
    }

    #[test]
    fn test_resolve_reference() {
        let registry = ControllerRegistry::new();
        registry.insert(endpoint()).unwrap();

        let (instance, action) = registry.resolve("TestEndpoint.hash").unwrap();
        assert_eq!(instance.name(), "TestEndpoint");
        assert_eq!(action(&mut ()).unwrap(), json!("hash"));

        // Private members are reachable by explicit reference.
        assert!(registry.resolve("TestEndpoint._private").is_ok());
    }

    #[test]
    fn test_resolve_errors() {
        let registry = ControllerRegistry::new();
        registry.insert(endpoint()).unwrap();

        assert_eq!(
            registry.resolve("Missing.hash").err(),
            Some(DispatchError::ControllerNotRegistered("Missing".into()))
        );
        assert_eq!(
            registry.resolve("TestEndpoint.nope").err(),
            Some(DispatchError::ActionNotFound {
                controller: "TestEndpoint".into(),
                action: "nope".into(),
            })
        );
        // Value members are not actions.
        assert!(matches!(
            registry.resolve("TestEndpoint.counter"),
            Err(DispatchError::ActionNotFound { .. })
        ));
        assert!(matches!(
            registry.resolve("TestEndpoint"),
            Err(DispatchError::ActionNotFound { .. })
        ));
    }

    #[test]
    fn test_drop_is_irreversible() {
        let registry = ControllerRegistry::new();
        registry.insert(endpoint()).unwrap();
        assert_eq!(registry.names(), vec!["TestEndpoint"]);

        assert_eq!(registry.drop_all(), 1);
        assert!(registry.is_dropped());
        assert!(registry.is_empty());

        assert_eq!(
            registry.resolve("TestEndpoint.hash").err(),
            Some(DispatchError::DynamicRoutingDisabled)
        );
        assert_eq!(
            registry.insert(endpoint()).unwrap_err(),
            DispatchError::DynamicRoutingDisabled
        );
        assert!(registry.is_dropped());
        assert_eq!(registry.drop_all(), 0);
    }

    #[test]
    fn test_reinsert_overwrites() {
        let registry = ControllerRegistry::new();
        registry.insert(endpoint()).unwrap();
        let replacement = Controller::new("TestEndpoint")
            .action("other", |_: &mut ()| Ok(json!(1)))
            .instantiate();
        registry.insert(replacement).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("TestEndpoint.other").is_ok());
        assert!(registry.resolve("TestEndpoint.hash").is_err());
    }
}
