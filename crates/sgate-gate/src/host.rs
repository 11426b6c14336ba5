//! # Host Framework Hook Contract
//!
//! The gateway runs inside a host service framework. It needs two
//! interception points from that framework:
//!
//! - a before-call hook receiving `(call_name, payload)` that either lets the
//!   call proceed or refuses it with a [`GatewayError`], and
//! - an event wrapper that decorates each registered event handler so the
//!   payload is inspected before the handler runs.
//!
//! [`ServiceHost`] is that contract. [`LocalHost`] is an in-process host that
//! dispatches actions and events through the registered hooks; it backs the
//! CLI and the integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use sgate_core::GatewayError;

/// Payload and metadata of one delivered event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    /// Logical event name.
    pub event_name: String,
    /// Event payload.
    pub payload: Value,
    /// Emitting node or service, when the transport knows it.
    pub sender: Option<String>,
}

impl EventContext {
    pub fn new(event_name: impl Into<String>, payload: Value) -> Self {
        Self {
            event_name: event_name.into(),
            payload,
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// A registered event handler.
pub type EventHandler = Arc<dyn Fn(&EventContext) + Send + Sync>;

/// A registered action handler: business logic behind a call name.
pub type ActionHandler = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Hook run before every inbound action call.
pub trait BeforeCallHook: Send + Sync {
    /// `Ok(())` lets the call proceed. An error refuses it; the host returns
    /// the error to the caller without running business logic.
    fn before_call(&self, call_name: &str, payload: &Value) -> Result<(), GatewayError>;
}

/// Decorates event handlers. The returned handler must never panic or
/// propagate a validation failure into the delivery path.
pub trait EventWrapper: Send + Sync {
    fn wrap(&self, event_name: &str, handler: EventHandler) -> EventHandler;
}

/// The interception surface a host framework exposes to the gateway.
pub trait ServiceHost {
    /// Name of the hosted service, for logs.
    fn service_name(&self) -> &str;

    /// Every call and event name the service registered. A remote schema
    /// source fetches one schema per declared name.
    fn declared_names(&self) -> Vec<String>;

    fn register_before_call(&mut self, hook: Arc<dyn BeforeCallHook>);

    fn register_event_wrapper(&mut self, wrapper: Arc<dyn EventWrapper>);
}

/// Failure to dispatch through a [`LocalHost`].
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No action registered under the name.
    #[error("unknown action: {0}")]
    UnknownAction(String),
    /// A before-call hook refused the call.
    #[error(transparent)]
    Refused(#[from] GatewayError),
}

/// In-process service host.
///
/// Hooks run in registration order; the first refusal wins. Event handlers
/// are wrapped when a handler or wrapper is registered, the first registered
/// wrapper outermost.
#[derive(Default)]
pub struct LocalHost {
    name: String,
    actions: BTreeMap<String, ActionHandler>,
    events: BTreeMap<String, EventHandler>,
    /// `events` with every wrapper applied.
    delivery: BTreeMap<String, EventHandler>,
    hooks: Vec<Arc<dyn BeforeCallHook>>,
    wrappers: Vec<Arc<dyn EventWrapper>>,
}

impl std::fmt::Debug for LocalHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalHost")
            .field("name", &self.name)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.len())
            .field("wrappers", &self.wrappers.len())
            .finish()
    }
}

impl LocalHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Register business logic for a call name.
    pub fn action(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.actions.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register a handler for an event name.
    pub fn event(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&EventContext) + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let handler: EventHandler = Arc::new(handler);
        self.delivery.insert(name.clone(), self.wrapped(&name, &handler));
        self.events.insert(name, handler);
        self
    }

    fn wrapped(&self, event_name: &str, handler: &EventHandler) -> EventHandler {
        self.wrappers
            .iter()
            .rev()
            .fold(Arc::clone(handler), |inner, wrapper| wrapper.wrap(event_name, inner))
    }

    /// Dispatch an action call through the before-call hooks.
    ///
    /// # Errors
    ///
    /// `UnknownAction` for an unregistered name, `Refused` when a hook
    /// blocks the call.
    pub fn call(&self, name: &str, payload: &Value) -> Result<Value, HostError> {
        let handler = self
            .actions
            .get(name)
            .ok_or_else(|| HostError::UnknownAction(name.to_string()))?;
        for hook in &self.hooks {
            hook.before_call(name, payload)?;
        }
        Ok(handler(payload))
    }

    /// Deliver an event. Returns `false` when no handler is registered for
    /// the name. Delivery itself never fails.
    pub fn emit(&self, context: EventContext) -> bool {
        let Some(handler) = self.delivery.get(&context.event_name) else {
            tracing::debug!(event = %context.event_name, "No handler for event");
            return false;
        };
        handler(&context);
        true
    }
}

impl ServiceHost for LocalHost {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn declared_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .actions
            .keys()
            .chain(self.events.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn register_before_call(&mut self, hook: Arc<dyn BeforeCallHook>) {
        self.hooks.push(hook);
    }

    fn register_event_wrapper(&mut self, wrapper: Arc<dyn EventWrapper>) {
        self.wrappers.push(wrapper);
        self.delivery = self
            .events
            .iter()
            .map(|(name, handler)| (name.clone(), self.wrapped(name, handler)))
            .collect();
    }
}
