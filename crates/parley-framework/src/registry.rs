//! The handler registry.
//!
//! Handlers are collected with a [`RegistryBuilder`] in declaration order and
//! validated once by [`RegistryBuilder::build`]. The resulting
//! [`HandlerRegistry`] is immutable and can be shared across tasks without
//! locking.
//!
//! Registration order is significant: when several handlers would match the
//! same idle event, the one registered first wins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use parley_core::Event;

use crate::descriptor::HandlerDescriptor;
use crate::error::{DispatchError, DispatchResult, RegistryError, RegistryResult};
use crate::handler::BoxedAction;
use crate::matcher::{Captures, MatchLimits, Matcher};

/// A validated, compiled handler.
pub struct RegisteredHandler {
    name: Arc<str>,
    next: Option<Arc<str>>,
    matcher: Matcher,
    conversation_step: bool,
    action: BoxedAction,
}

impl RegisteredHandler {
    /// Returns the handler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Returns the declared next handler, if any.
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub(crate) fn next_arc(&self) -> Option<Arc<str>> {
        self.next.clone()
    }

    /// Returns the compiled trigger.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Returns `true` if this handler is only reachable through an armed
    /// conversation.
    pub fn is_conversation_step(&self) -> bool {
        self.conversation_step
    }

    pub(crate) fn action(&self) -> &BoxedAction {
        &self.action
    }
}

impl std::fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("name", &self.name)
            .field("next", &self.next)
            .field("matcher", &self.matcher)
            .field("conversation_step", &self.conversation_step)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RegistryBuilder
// =============================================================================

/// Collects descriptors in registration order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    descriptors: Vec<HandlerDescriptor>,
    limits: MatchLimits,
}

impl RegistryBuilder {
    /// Creates an empty builder with default match limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the limits applied to every compiled pattern.
    pub fn limits(mut self, limits: MatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Appends a descriptor.
    pub fn register(&mut self, descriptor: HandlerDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Appends a descriptor (builder pattern).
    pub fn with(mut self, descriptor: HandlerDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Appends several descriptors, keeping their order.
    pub fn extend(&mut self, descriptors: impl IntoIterator<Item = HandlerDescriptor>) -> &mut Self {
        self.descriptors.extend(descriptors);
        self
    }

    /// Returns the number of descriptors collected so far.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Validates the descriptors and freezes them into a registry.
    ///
    /// Fails on duplicate names, missing actions, patterns that do not
    /// compile, and `next` names that do not resolve.
    pub fn build(self) -> RegistryResult<HandlerRegistry> {
        let mut seen = HashSet::new();
        for descriptor in &self.descriptors {
            if !seen.insert(descriptor.name.as_str()) {
                return Err(RegistryError::DuplicateHandler(descriptor.name.clone()));
            }
        }

        // Names that some handler hands the conversation to
        let step_targets: HashSet<&str> = self
            .descriptors
            .iter()
            .filter_map(|d| d.next.as_deref())
            .collect();

        for descriptor in &self.descriptors {
            if let Some(next) = descriptor.next.as_deref()
                && !seen.contains(next)
            {
                return Err(RegistryError::UnknownHandler {
                    referrer: descriptor.name.clone(),
                    name: next.to_string(),
                });
            }
        }

        let mut handlers = Vec::with_capacity(self.descriptors.len());
        for descriptor in &self.descriptors {
            let action = descriptor
                .action
                .clone()
                .ok_or_else(|| RegistryError::MissingAction(descriptor.name.clone()))?;

            let matcher = Matcher::compile(
                &descriptor.event_types,
                descriptor.pattern.as_deref(),
                &self.limits,
            )
            .map_err(|source| RegistryError::MalformedPattern {
                handler: descriptor.name.clone(),
                pattern: descriptor.pattern.clone().unwrap_or_default(),
                source,
            })?;

            let conversation_step =
                descriptor.conversation_only || step_targets.contains(descriptor.name.as_str());

            debug!(
                handler = %descriptor.name,
                pattern = descriptor.pattern.as_deref().unwrap_or("<any>"),
                next = descriptor.next.as_deref().unwrap_or("<none>"),
                conversation_step,
                "Registered handler"
            );

            handlers.push(RegisteredHandler {
                name: Arc::from(descriptor.name.as_str()),
                next: descriptor.next.as_deref().map(Arc::from),
                matcher,
                conversation_step,
                action,
            });
        }

        let by_name = handlers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.name_arc(), i))
            .collect();

        info!(handlers = handlers.len(), "Handler registry built");

        Ok(HandlerRegistry { handlers, by_name })
    }
}

// =============================================================================
// HandlerRegistry
// =============================================================================

/// The frozen, ordered handler table.
pub struct HandlerRegistry {
    handlers: Vec<RegisteredHandler>,
    by_name: HashMap<Arc<str>, usize>,
}

impl HandlerRegistry {
    /// Starts a new builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up a handler by name.
    pub fn lookup(&self, name: &str) -> DispatchResult<&RegisteredHandler> {
        self.get(name)
            .ok_or_else(|| DispatchError::UnknownHandler(name.to_string()))
    }

    /// Returns the handler with the given name, if registered.
    pub fn get(&self, name: &str) -> Option<&RegisteredHandler> {
        self.by_name.get(name).map(|&i| &self.handlers[i])
    }

    /// Returns `true` if a handler with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterates over handlers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredHandler> {
        self.handlers.iter()
    }

    /// Returns handler names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(RegisteredHandler::name)
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Finds the first handler, in registration order, whose trigger matches
    /// an idle event. Conversation steps are skipped.
    pub fn find_match(&self, event: &Event) -> Option<(&RegisteredHandler, Captures)> {
        self.handlers
            .iter()
            .filter(|h| !h.conversation_step)
            .find_map(|h| h.matcher.matches(event).map(|caps| (h, caps)))
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers)
            .finish()
    }
}
