//! Per-request controller facade.
//!
//! # Responsibilities
//! - Attach the owning controller to a fresh execution context
//! - Build, on first access, a facade exposing every member of that controller
//! - Invoke facade methods against the live execution context
//!
//! # Data Flow
//! ```text
//! engine: route matched
//!     → patch_context(ctx, owner)      slot: NoFacade
//!     → action(ctx)
//!         → ctx.controller()           slot: FacadeBuilt (memoized)
//!         → facade.invoke("_private", ctx)
//!     → ctx dropped with the request
//! ```
//!
//! # Design Decisions
//! - No exclusions: lifecycle and `_`-prefixed members are all present
//! - Value members are copied from the instance, else the declared default
//! - Methods receive the context explicitly; the facade is bound to one
//!   context id and refuses any other context
//! - Building only reads the shared controller instance

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::controller::definition::{Action, ControllerInstance, Member};
use crate::error::ActionError;

/// Errors raised when using a facade.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// The context is not bound to a controller (free-function route).
    #[error("no controller is bound to this context")]
    NoController,

    #[error("controller \"{controller}\" has no member \"{member}\"")]
    UnknownMember { controller: String, member: String },

    #[error("member \"{0}\" is a value, not a method")]
    NotCallable(String),

    /// The facade was built for a different request.
    #[error("facade belongs to another execution context")]
    ForeignContext,

    /// The invoked method itself failed.
    #[error("{0}")]
    Action(ActionError),
}

/// A facade member: a method awaiting a context, or a copied value.
pub enum FacadeMember<C> {
    Method(Action<C>),
    Value(serde_json::Value),
}

/// Every member of the owning controller, bound to one execution context.
pub struct ControllerFacade<C> {
    context_id: Uuid,
    controller: String,
    members: IndexMap<String, FacadeMember<C>>,
}

impl<C: ExecutionContext> ControllerFacade<C> {
    /// Build the facade for the context identified by `context_id`.
    pub fn build(context_id: Uuid, instance: &ControllerInstance<C>) -> Self {
        let members = instance
            .definition()
            .members()
            .map(|(name, member)| {
                let member = match member {
                    Member::Action(action) => FacadeMember::Method(action.clone()),
                    Member::Value(default) => FacadeMember::Value(
                        instance.field(name).unwrap_or(default).clone(),
                    ),
                };
                (name.to_string(), member)
            })
            .collect();

        Self {
            context_id,
            controller: instance.name().to_string(),
            members,
        }
    }

    /// Call method `name` with `ctx` as its subject.
    pub fn invoke(&self, name: &str, ctx: &mut C) -> Result<serde_json::Value, FacadeError> {
        if ctx.context_id() != self.context_id {
            return Err(FacadeError::ForeignContext);
        }

        match self.members.get(name) {
            Some(FacadeMember::Method(method)) => method(ctx).map_err(FacadeError::Action),
            Some(FacadeMember::Value(_)) => Err(FacadeError::NotCallable(name.to_string())),
            None => Err(FacadeError::UnknownMember {
                controller: self.controller.clone(),
                member: name.to_string(),
            }),
        }
    }
}

impl<C> ControllerFacade<C> {
    pub fn context_id(&self) -> Uuid {
        self.context_id
    }

    pub fn controller_name(&self) -> &str {
        &self.controller
    }

    /// Member names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn is_method(&self, name: &str) -> bool {
        matches!(self.members.get(name), Some(FacadeMember::Method(_)))
    }

    /// Copied value of a value member.
    pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
        match self.members.get(name)? {
            FacadeMember::Value(value) => Some(value),
            FacadeMember::Method(_) => None,
        }
    }
}

impl<C> fmt::Debug for ControllerFacade<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerFacade")
            .field("context_id", &self.context_id)
            .field("controller", &self.controller)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Context-side storage for the owning controller and its memoized facade.
pub struct FacadeSlot<C> {
    owner: Option<Arc<ControllerInstance<C>>>,
    facade: OnceCell<Arc<ControllerFacade<C>>>,
}

impl<C> FacadeSlot<C> {
    /// A slot with no owner; `controller()` fails with `NoController`.
    pub fn empty() -> Self {
        Self {
            owner: None,
            facade: OnceCell::new(),
        }
    }

    pub fn owner(&self) -> Option<&Arc<ControllerInstance<C>>> {
        self.owner.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.facade.get().is_some()
    }
}

impl<C: ExecutionContext> FacadeSlot<C> {
    /// The facade for `context_id`, built on first call.
    pub fn get_or_build(&self, context_id: Uuid) -> Result<Arc<ControllerFacade<C>>, FacadeError> {
        let owner = self.owner.as_ref().ok_or(FacadeError::NoController)?;
        let facade = self.facade.get_or_init(|| {
            tracing::trace!(
                context_id = %context_id,
                controller = %owner.name(),
                "Building controller facade"
            );
            Arc::new(ControllerFacade::build(context_id, owner))
        });
        Ok(facade.clone())
    }
}

impl<C> Default for FacadeSlot<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C> fmt::Debug for FacadeSlot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeSlot")
            .field("owner", &self.owner.as_ref().map(|o| o.name()))
            .field("built", &self.is_built())
            .finish()
    }
}

/// Bind `ctx` to the controller owning the matched route.
///
/// Called by the engine once per request, before the action runs. Any facade
/// built for a previous owner is discarded.
pub fn patch_context<C: ExecutionContext>(ctx: &mut C, owner: Option<Arc<ControllerInstance<C>>>) {
    *ctx.facade_slot_mut() = FacadeSlot {
        owner,
        facade: OnceCell::new(),
    };
}
