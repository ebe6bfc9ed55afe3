//! Method registry.
//!
//! Handlers are registered on a [`RegistryBuilder`] and frozen into an
//! immutable [`Registry`] before serving begins. A registry is `Send + Sync`
//! and is shared between pipelines through an `Arc`; nothing can be added
//! once it has been built.
//!
//! Names beginning with [`RESERVED_PREFIX`] are reserved for the pipeline
//! hooks. Registering one is rejected unless it names one of the four
//! [`Hook`]s, and requests addressed to a reserved name never reach a hook.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rivet_protocol::Params;

use crate::error::{HandlerError, RegistrationError};
use crate::handler::{
    BoxedHandler, Handler, IntoBoundHandler, IntoBoundScopedHandler, IntoHandler,
    IntoScopedHandler,
};
use crate::params::ParamShape;
use crate::result::DispatchResult;
use crate::scratch::Scratch;

/// Prefix reserved for pipeline hooks.
pub const RESERVED_PREFIX: &str = "rpc.";

/// Pipeline hooks that may be registered under reserved names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// `rpc.pre-request`: runs before every well-formed request.
    PreRequest,
    /// `rpc.fallback`: handles methods with no registered handler. Receives
    /// `{"method", "params"}`.
    Fallback,
    /// `rpc.on-error`: observes handler failures. Receives
    /// `{"method", "code", "message"}`.
    OnError,
    /// `rpc.end-request`: runs after every well-formed request.
    EndRequest,
}

impl Hook {
    /// All hooks, in pipeline order.
    pub const ALL: [Self; 4] = [
        Self::PreRequest,
        Self::Fallback,
        Self::OnError,
        Self::EndRequest,
    ];

    /// Returns the reserved method name of the hook.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreRequest => "rpc.pre-request",
            Self::Fallback => "rpc.fallback",
            Self::OnError => "rpc.on-error",
            Self::EndRequest => "rpc.end-request",
        }
    }

    /// Looks a hook up by its reserved method name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.name() == name)
    }
}

/// A registered method.
pub(crate) struct HandlerEntry {
    name: String,
    handler: BoxedHandler,
}

impl HandlerEntry {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shape(&self) -> ParamShape {
        self.handler.shape()
    }

    pub(crate) fn invoke(
        &self,
        scratch: &mut Scratch,
        params: &Params,
    ) -> Result<DispatchResult, HandlerError> {
        self.handler.invoke(scratch, params)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HookSlots {
    pre_request: Option<usize>,
    fallback: Option<usize>,
    on_error: Option<usize>,
    end_request: Option<usize>,
}

impl HookSlots {
    const fn slot(&mut self, hook: Hook) -> &mut Option<usize> {
        match hook {
            Hook::PreRequest => &mut self.pre_request,
            Hook::Fallback => &mut self.fallback,
            Hook::OnError => &mut self.on_error,
            Hook::EndRequest => &mut self.end_request,
        }
    }

    const fn get(&self, hook: Hook) -> Option<usize> {
        match hook {
            Hook::PreRequest => self.pre_request,
            Hook::Fallback => self.fallback,
            Hook::OnError => self.on_error,
            Hook::EndRequest => self.end_request,
        }
    }
}

/// Mutable registration phase of a [`Registry`].
///
/// # Example
///
/// ```
/// use rivet_dispatch::Registry;
///
/// let mut builder = Registry::builder();
/// builder
///     .register("add", |left: i64, right: i64| left + right)
///     .expect("registration succeeds");
/// let registry = builder.build();
/// assert_eq!(registry.methods(), vec!["add"]);
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<HandlerEntry>,
    index: HashMap<String, usize>,
    hooks: HookSlots,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plain function or closure.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the name is empty, reserved, or
    /// already registered.
    pub fn register<F, Args>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: IntoHandler<Args>,
    {
        self.insert(name.into(), handler.into_handler())
    }

    /// Registers a function whose first argument is the handler's scratch
    /// scope.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the name is empty, reserved, or
    /// already registered.
    pub fn register_scoped<F, Args>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: IntoScopedHandler<Args>,
    {
        self.insert(name.into(), handler.into_handler())
    }

    /// Registers a function bound to a shared receiver.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the name is empty, reserved, or
    /// already registered.
    pub fn register_bound<S, F, Args>(
        &mut self,
        name: impl Into<String>,
        receiver: Arc<S>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: IntoBoundHandler<S, Args>,
    {
        self.insert(name.into(), handler.into_handler(receiver))
    }

    /// Registers a function bound to a shared receiver that also takes the
    /// scratch scope.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the name is empty, reserved, or
    /// already registered.
    pub fn register_bound_scoped<S, F, Args>(
        &mut self,
        name: impl Into<String>,
        receiver: Arc<S>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: IntoBoundScopedHandler<S, Args>,
    {
        self.insert(name.into(), handler.into_handler(receiver))
    }

    /// Registers a hand-written [`Handler`] implementation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the name is empty, reserved, or
    /// already registered.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        self.insert(name.into(), Box::new(handler))
    }

    fn insert(
        &mut self,
        name: String,
        handler: BoxedHandler,
    ) -> Result<&mut Self, RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::EmptyMethodName);
        }
        let hook = Hook::from_name(&name);
        if hook.is_none() && name.starts_with(RESERVED_PREFIX) {
            return Err(RegistrationError::InvalidMethodName { name });
        }
        if self.index.contains_key(&name) {
            return Err(RegistrationError::DuplicateMethod { name });
        }

        let position = self.entries.len();
        if let Some(reserved) = hook {
            *self.hooks.slot(reserved) = Some(position);
        }
        self.index.insert(name.clone(), position);
        self.entries.push(HandlerEntry { name, handler });
        Ok(self)
    }

    /// Freezes the registrations.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            index: self.index,
            hooks: self.hooks,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("methods", &self.entries.len())
            .finish_non_exhaustive()
    }
}

/// Immutable method table shared by every pipeline.
pub struct Registry {
    entries: Vec<HandlerEntry>,
    index: HashMap<String, usize>,
    hooks: HookSlots,
}

impl Registry {
    /// Starts a registration phase.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Wraps the registry for sharing between pipelines.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Registered method names, hooks included, in registration order.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.entries.iter().map(HandlerEntry::name).collect()
    }

    /// Parameter shape of a registered method.
    #[must_use]
    pub fn shape(&self, method: &str) -> Option<ParamShape> {
        self.index
            .get(method)
            .and_then(|position| self.entries.get(*position))
            .map(HandlerEntry::shape)
    }

    /// Returns `true` when `method` is registered.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.index.contains_key(method)
    }

    /// Returns `true` when the hook has a handler.
    #[must_use]
    pub const fn has_hook(&self, hook: Hook) -> bool {
        self.hooks.get(hook).is_some()
    }

    /// Number of registered methods, hooks included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invokes a method directly with a fresh scratch scope, bypassing hooks.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::MethodNotFound`] for unknown or reserved
    /// names, and any error the handler raises.
    pub fn invoke(&self, method: &str, params: &Params) -> Result<DispatchResult, HandlerError> {
        let (_, entry) = self.lookup(method).ok_or(HandlerError::MethodNotFound)?;
        entry.invoke(&mut Scratch::default(), params)
    }

    /// Resolves a request method. Reserved names never resolve.
    pub(crate) fn lookup(&self, method: &str) -> Option<(usize, &HandlerEntry)> {
        if method.starts_with(RESERVED_PREFIX) {
            return None;
        }
        self.entry(*self.index.get(method)?)
    }

    pub(crate) fn hook(&self, hook: Hook) -> Option<(usize, &HandlerEntry)> {
        self.entry(self.hooks.get(hook)?)
    }

    fn entry(&self, position: usize) -> Option<(usize, &HandlerEntry)> {
        self.entries.get(position).map(|entry| (position, entry))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("methods", &self.methods())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
