//! Event dispatcher for the Parley framework.
//!
//! The [`Dispatcher`] owns the conversation state machine. For every event it
//! locks the event's conversation, then:
//!
//! 1. If a handler is armed for the conversation, that handler is invoked
//!    directly and trigger matching is skipped.
//! 2. Otherwise handlers are scanned in registration order and the first whose
//!    trigger matches is invoked.
//! 3. Once the handler returns, the transition it requested (if any) is
//!    applied while the conversation is still locked.
//!
//! Events for different conversations never wait on each other. Events for
//! the same conversation are handled one at a time.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parley_core::LogSink;
//! use parley_framework::{Dispatcher, HandlerRegistry};
//!
//! let registry = HandlerRegistry::builder().with(help_me).with(help_question).build()?;
//! let dispatcher = Dispatcher::new(registry, Arc::new(LogSink));
//!
//! let outcome = dispatcher.dispatch(event).await;
//! ```

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::Service;
use tracing::{Instrument, debug, debug_span, error, info, trace, warn};

use parley_core::{BoxedReplySink, ConversationKey, Event};

use crate::context::{HandlerContext, Transition};
use crate::error::DispatchError;
use crate::matcher::Captures;
use crate::registry::{HandlerRegistry, RegisteredHandler};
use crate::store::{ArmedHandler, ConversationSlot, ConversationStore};

/// Limits on how long a conversation may stay armed.
///
/// Both limits are off by default: an armed conversation waits for its next
/// event indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationPolicy {
    /// Armed conversations that see no event for this long return to idle.
    pub idle_timeout: Option<Duration>,
    /// Armed conversations return to idle after this many consecutive armed
    /// invocations that request no transition.
    pub max_missed_turns: Option<u32>,
}

impl ConversationPolicy {
    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Sets the missed-turn limit.
    pub fn max_missed_turns(mut self, turns: u32) -> Self {
        self.max_missed_turns = Some(turns);
        self
    }

    fn is_expired(&self, armed: &ArmedHandler) -> bool {
        self.idle_timeout
            .is_some_and(|timeout| armed.last_active().elapsed() >= timeout)
    }
}

/// The state a conversation is left in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    /// The next event goes through trigger matching.
    Idle,
    /// The next event goes straight to the named handler.
    Armed(String),
}

impl ConversationState {
    fn of(slot: &ConversationSlot) -> Self {
        match slot.armed() {
            Some(armed) => Self::Armed(armed.name().to_string()),
            None => Self::Idle,
        }
    }

    /// Returns the armed handler's name, if any.
    pub fn armed(&self) -> Option<&str> {
        match self {
            Self::Armed(name) => Some(name),
            Self::Idle => None,
        }
    }
}

/// What happened to a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No handler was invoked.
    Dropped,
    /// A handler was invoked.
    Handled {
        /// The invoked handler.
        handler: String,
        /// The conversation state after the invocation.
        state: ConversationState,
    },
}

impl Outcome {
    /// Returns `true` if a handler was invoked.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    /// Returns the invoked handler's name, if any.
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::Handled { handler, .. } => Some(handler),
            Self::Dropped => None,
        }
    }

    /// Returns the conversation state after the invocation, if a handler ran.
    pub fn state(&self) -> Option<&ConversationState> {
        match self {
            Self::Handled { state, .. } => Some(state),
            Self::Dropped => None,
        }
    }
}

struct DispatcherInner {
    registry: Arc<HandlerRegistry>,
    store: ConversationStore,
    sink: BoxedReplySink,
    policy: ConversationPolicy,
}

/// The conversation-aware event dispatcher.
///
/// Cloning is cheap; clones share the registry and conversation state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default (unbounded) conversation policy.
    pub fn new(registry: impl Into<Arc<HandlerRegistry>>, sink: BoxedReplySink) -> Self {
        Self::with_policy(registry, sink, ConversationPolicy::default())
    }

    /// Creates a dispatcher with an explicit conversation policy.
    pub fn with_policy(
        registry: impl Into<Arc<HandlerRegistry>>,
        sink: BoxedReplySink,
        policy: ConversationPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry: registry.into(),
                store: ConversationStore::new(),
                sink,
                policy,
            }),
        }
    }

    /// Returns the handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    /// Returns the conversation store.
    pub fn store(&self) -> &ConversationStore {
        &self.inner.store
    }

    /// Returns the conversation policy.
    pub fn policy(&self) -> &ConversationPolicy {
        &self.inner.policy
    }

    /// Returns the current state of a conversation.
    pub async fn conversation_state(&self, key: &ConversationKey) -> ConversationState {
        ConversationState::of(&*self.inner.store.lock(key).await)
    }

    /// Forces a conversation back to idle. Returns `true` if it was armed.
    pub async fn reset(&self, key: &ConversationKey) -> bool {
        self.inner.store.reset(key).await
    }

    /// Dispatches one event.
    ///
    /// Never fails: handler errors, panics and bad transitions are logged and
    /// leave the conversation idle.
    pub async fn dispatch(&self, event: Event) -> Outcome {
        let span = debug_span!(
            "dispatch",
            key = %event.key(),
            event_type = %event.event_type()
        );
        self.dispatch_event(Arc::new(event)).instrument(span).await
    }

    async fn dispatch_event(&self, event: Arc<Event>) -> Outcome {
        let inner = &self.inner;
        let mut slot = inner.store.lock(event.key()).await;

        if let Some(armed) = slot.armed()
            && inner.policy.is_expired(armed)
        {
            info!(handler = armed.name(), "Conversation timed out, returning to idle");
            slot.disarm();
        }

        let armed_name = slot.armed().map(|armed| armed.name().to_string());
        let (handler, captures) = match armed_name {
            Some(name) => match inner.registry.lookup(&name) {
                Ok(handler) => (handler, Captures::empty()),
                Err(e) => {
                    warn!(error = %e, "Armed handler is not registered, discarding conversation");
                    slot.disarm();
                    return Outcome::Dropped;
                }
            },
            None => match inner.registry.find_match(&event) {
                Some(found) => found,
                None => {
                    trace!("No handler matched");
                    return Outcome::Dropped;
                }
            },
        };
        let armed = slot.armed().is_some();

        let ctx = Arc::new(HandlerContext::new(
            Arc::clone(&event),
            captures,
            handler.name_arc(),
            armed,
            Arc::clone(&inner.sink),
        ));

        debug!(handler = handler.name(), armed, "Invoking handler");
        let result = AssertUnwindSafe((handler.action())(Arc::clone(&ctx)))
            .catch_unwind()
            .await;

        if result.is_err() {
            error!(handler = handler.name(), "Handler panicked, returning conversation to idle");
            slot.disarm();
            return Outcome::Handled {
                handler: handler.name().to_string(),
                state: ConversationState::Idle,
            };
        }

        self.apply_transition(&mut slot, handler, ctx.take_transition(), armed);
        let state = ConversationState::of(&slot);
        debug!(handler = handler.name(), ?state, replies = ctx.replies_sent(), "Handler finished");

        Outcome::Handled {
            handler: handler.name().to_string(),
            state,
        }
    }

    fn apply_transition(
        &self,
        slot: &mut ConversationSlot,
        handler: &RegisteredHandler,
        transition: Option<Transition>,
        was_armed: bool,
    ) {
        match transition {
            Some(Transition::Start(next)) => match self.inner.registry.lookup(&next) {
                Ok(target) => slot.arm(target.name_arc()),
                Err(e) => {
                    warn!(handler = handler.name(), error = %e, "Cannot start conversation");
                    slot.disarm();
                }
            },
            Some(Transition::Advance) => match handler.next_arc() {
                Some(next) => slot.arm(next),
                None => {
                    let e = DispatchError::NoNextHandler(handler.name().to_string());
                    warn!(error = %e, "Cannot advance conversation");
                    slot.disarm();
                }
            },
            Some(Transition::Stop) => {
                slot.disarm();
            }
            None if was_armed => {
                let missed = slot.record_missed_turn();
                if let Some(limit) = self.inner.policy.max_missed_turns
                    && missed >= limit
                {
                    info!(
                        handler = handler.name(),
                        missed, "Conversation made no progress, returning to idle"
                    );
                    slot.disarm();
                }
            }
            None => {}
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.inner.registry.len())
            .field("active_conversations", &self.inner.store.len())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

impl Service<Event> for Dispatcher {
    type Response = Outcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Outcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: Event) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(event).await) })
    }
}
