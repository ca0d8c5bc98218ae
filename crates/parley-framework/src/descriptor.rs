//! Handler descriptors.
//!
//! A [`HandlerDescriptor`] is the declarative description of one handler:
//! its unique name, its trigger (event types and pattern), the handler it
//! hands the conversation to when it calls `advance()`, and its action.
//! Descriptors are collected at startup and validated by
//! [`RegistryBuilder::build`](crate::RegistryBuilder::build).
//!
//! ```rust,ignore
//! use parley_framework::HandlerDescriptor;
//!
//! let help_me = HandlerDescriptor::new("helpMe")
//!     .pattern("(help me)")
//!     .next("helpQuestion")
//!     .handler(help_me);
//! ```

use parley_core::EventType;

use crate::handler::{BoxedAction, Handler, into_action};

/// The declarative description of one handler.
#[derive(Clone)]
pub struct HandlerDescriptor {
    pub(crate) name: String,
    pub(crate) event_types: Vec<EventType>,
    pub(crate) pattern: Option<String>,
    pub(crate) next: Option<String>,
    pub(crate) conversation_only: bool,
    pub(crate) action: Option<BoxedAction>,
}

impl HandlerDescriptor {
    /// Creates a descriptor that accepts every event type and any text.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_types: Vec::new(),
            pattern: None,
            next: None,
            conversation_only: false,
            action: None,
        }
    }

    /// Adds one accepted event type.
    pub fn on(mut self, event_type: EventType) -> Self {
        if !self.event_types.contains(&event_type) {
            self.event_types.push(event_type);
        }
        self
    }

    /// Adds several accepted event types.
    pub fn events(self, event_types: impl IntoIterator<Item = EventType>) -> Self {
        event_types.into_iter().fold(self, Self::on)
    }

    /// Sets the trigger pattern.
    ///
    /// The pattern is compiled case-insensitively and applied to the whole
    /// text exactly as written; add `^...$` to anchor it.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the handler armed when this handler calls `advance()`.
    ///
    /// A handler named as another handler's `next` is a conversation step:
    /// it is only reachable through an armed conversation.
    pub fn next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Excludes this handler from trigger matching.
    ///
    /// Use this for handlers that are only ever armed through
    /// `start_conversation` and are not named as any handler's `next`.
    pub fn conversation_only(mut self) -> Self {
        self.conversation_only = true;
        self
    }

    /// Sets the action from a handler function.
    pub fn handler<F, T>(mut self, f: F) -> Self
    where
        F: Handler<T> + Send + Sync + 'static,
        T: 'static,
    {
        self.action = Some(into_action(f));
        self
    }

    /// Sets a pre-built boxed action.
    pub fn handler_boxed(mut self, action: BoxedAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Returns the handler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the accepted event types; empty means any.
    pub fn event_types(&self) -> &[EventType] {
        &self.event_types
    }

    /// Returns the trigger pattern source, if any.
    pub fn pattern_source(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Returns the declared next handler, if any.
    pub fn next_name(&self) -> Option<&str> {
        self.next.as_deref()
    }
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("event_types", &self.event_types)
            .field("pattern", &self.pattern)
            .field("next", &self.next)
            .field("conversation_only", &self.conversation_only)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

/// Creates a descriptor that only accepts generic channel messages.
pub fn on_message(name: impl Into<String>) -> HandlerDescriptor {
    HandlerDescriptor::new(name).on(EventType::Message)
}

/// Creates a descriptor that accepts messages addressed to the bot, either
/// as a mention or a direct message.
pub fn on_direct(name: impl Into<String>) -> HandlerDescriptor {
    HandlerDescriptor::new(name).events([EventType::DirectMention, EventType::DirectMessage])
}

/// Creates a descriptor for a single event type.
pub fn on_event_type(name: impl Into<String>, event_type: EventType) -> HandlerDescriptor {
    HandlerDescriptor::new(name).on(event_type)
}

/// Creates a descriptor triggered by `pattern` on any event type.
pub fn on_pattern(name: impl Into<String>, pattern: impl Into<String>) -> HandlerDescriptor {
    HandlerDescriptor::new(name).pattern(pattern)
}

/// Declares a [`HandlerDescriptor`] in one block.
///
/// Fields must appear in this order; all but `name` and `action` are
/// optional.
///
/// ```rust,ignore
/// use parley_framework::handler;
/// use parley_core::EventType;
///
/// let descriptor = handler! {
///     name: "onReceiveMessage",
///     events: [EventType::Message],
///     pattern: r"^([a-z ]{2})(\d+)([a-z ]{2})$",
///     action: on_receive_message,
/// };
/// ```
#[macro_export]
macro_rules! handler {
    (
        name: $name:expr,
        $( events: [$($event:expr),* $(,)?], )?
        $( pattern: $pattern:expr, )?
        $( next: $next:expr, )?
        $( conversation_only: $only:expr, )?
        action: $action:expr $(,)?
    ) => {{
        let descriptor = $crate::HandlerDescriptor::new($name);
        $( let descriptor = descriptor.events([$($event),*]); )?
        $( let descriptor = descriptor.pattern($pattern); )?
        $( let descriptor = descriptor.next($next); )?
        $(
            let descriptor = if $only {
                descriptor.conversation_only()
            } else {
                descriptor
            };
        )?
        descriptor.handler($action)
    }};
}
