//! Declarative controller definitions.
//!
//! # Responsibilities
//! - Hold a controller's ordered member list (actions and plain values)
//! - Run the optional instance initializer once, at instantiation
//! - Expose the singleton instance shared by every request for that controller
//!
//! # Design Decisions
//! - Members are declared explicitly with a builder, never discovered at runtime
//! - Actions take the execution context as an explicit argument
//! - Redeclaring a member name replaces the earlier member in place, so member
//!   order is the order names were first declared
//! - Instance fields are read-only after instantiation; per-request state lives
//!   on the execution context

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ActionError;

/// Outcome of an action body.
pub type ActionResult = Result<serde_json::Value, ActionError>;

/// A controller member callable with an execution context.
pub type Action<C> = Arc<dyn Fn(&mut C) -> ActionResult + Send + Sync>;

/// Own values set on a controller instance by its initializer.
pub type Fields = IndexMap<String, serde_json::Value>;

type Initializer = Box<dyn Fn(&mut Fields) + Send + Sync>;

/// A declared controller member.
pub enum Member<C> {
    /// Callable member.
    Action(Action<C>),
    /// Plain value with its type-level default.
    Value(serde_json::Value),
}

impl<C> Member<C> {
    pub fn is_action(&self) -> bool {
        matches!(self, Member::Action(_))
    }

    pub fn as_action(&self) -> Option<&Action<C>> {
        match self {
            Member::Action(action) => Some(action),
            Member::Value(_) => None,
        }
    }
}

impl<C> Clone for Member<C> {
    fn clone(&self) -> Self {
        match self {
            Member::Action(action) => Member::Action(action.clone()),
            Member::Value(value) => Member::Value(value.clone()),
        }
    }
}

impl<C> fmt::Debug for Member<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Action(_) => f.write_str("Action(..)"),
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Controller type definition, generic over the execution context it serves.
///
/// ```ignore
/// let ping = Controller::<HttpContext>::new("TestEndpoint")
///     .action("ping", |_ctx| Ok(json!("pong")))
///     .action("_secret", |_ctx| Ok(json!(42)))
///     .value("greeting", "hello");
/// ```
pub struct Controller<C> {
    name: String,
    members: Vec<(String, Member<C>)>,
    init: Option<Initializer>,
}

impl<C> Controller<C> {
    /// Start a definition for the controller named `name` (e.g. `TestEndpoint`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            init: None,
        }
    }

    /// Declare an action member.
    pub fn action<F>(self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut C) -> ActionResult + Send + Sync + 'static,
    {
        self.member(name, Member::Action(Arc::new(action)))
    }

    /// Declare a plain value member with its default.
    pub fn value(self, name: impl Into<String>, default: impl Into<serde_json::Value>) -> Self {
        self.member(name, Member::Value(default.into()))
    }

    /// Declare the instance initializer.
    ///
    /// It runs once, when the controller is instantiated, and may set own values
    /// for declared value members. Values set for undeclared names stay on the
    /// instance but are not members.
    pub fn init<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut Fields) + Send + Sync + 'static,
    {
        self.init = Some(Box::new(init));
        self
    }

    fn member(mut self, name: impl Into<String>, member: Member<C>) -> Self {
        let name = name.into();
        match self.members.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = member,
            None => self.members.push((name, member)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member<C>)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    pub fn get(&self, name: &str) -> Option<&Member<C>> {
        self.members
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, member)| member)
    }

    /// Build the singleton instance, running the initializer.
    pub fn instantiate(self) -> Arc<ControllerInstance<C>> {
        let mut fields = Fields::new();
        if let Some(init) = &self.init {
            init(&mut fields);
        }

        tracing::trace!(
            controller = %self.name,
            members = self.members.len(),
            fields = fields.len(),
            "Controller instantiated"
        );

        Arc::new(ControllerInstance {
            definition: self,
            fields,
        })
    }
}

impl<C> fmt::Debug for Controller<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("init", &self.init.is_some())
            .finish()
    }
}

/// The process-wide instance of a controller.
pub struct ControllerInstance<C> {
    definition: Controller<C>,
    fields: Fields,
}

impl<C> ControllerInstance<C> {
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &Controller<C> {
        &self.definition
    }

    /// An own value set by the initializer.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Current value of a value member: the own value, else the default.
    pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
        match self.definition.get(name)? {
            Member::Value(default) => Some(self.fields.get(name).unwrap_or(default)),
            Member::Action(_) => None,
        }
    }

    /// The action member named `name`, if it is callable.
    pub fn action(&self, name: &str) -> Option<&Action<C>> {
        self.definition.get(name).and_then(Member::as_action)
    }
}

impl<C> fmt::Debug for ControllerInstance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerInstance")
            .field("name", &self.name())
            .field("fields", &self.fields)
            .finish()
    }
}
