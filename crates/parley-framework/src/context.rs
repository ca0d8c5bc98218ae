//! The context handed to a handler for one invocation.
//!
//! [`HandlerContext`] gives a handler its two side-effect channels:
//!
//! - **Replies** go straight to the [`ReplySink`](parley_core::ReplySink) via
//!   [`reply`](HandlerContext::reply).
//! - **Conversation transitions** ([`start_conversation`](HandlerContext::start_conversation),
//!   [`advance`](HandlerContext::advance), [`stop_conversation`](HandlerContext::stop_conversation))
//!   are recorded on the context and applied by the dispatcher once the handler
//!   returns, while the conversation is still locked.
//!
//! Only one transition survives an invocation: a later call replaces an
//! earlier one.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error};

use parley_core::{BoxedReplySink, ConversationKey, Event, Message};

use crate::matcher::Captures;

/// A state change requested by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Arm the named handler for the next event.
    Start(String),
    /// Arm the invoked handler's declared `next`.
    Advance,
    /// Return the conversation to idle.
    Stop,
}

/// Everything a handler can see and do during one invocation.
pub struct HandlerContext {
    event: Arc<Event>,
    captures: Captures,
    handler: Arc<str>,
    armed: bool,
    sink: BoxedReplySink,
    transition: Mutex<Option<Transition>>,
    replies: AtomicUsize,
}

impl HandlerContext {
    pub(crate) fn new(
        event: Arc<Event>,
        captures: Captures,
        handler: Arc<str>,
        armed: bool,
        sink: BoxedReplySink,
    ) -> Self {
        Self {
            event,
            captures,
            handler,
            armed,
            sink,
            transition: Mutex::new(None),
            replies: AtomicUsize::new(0),
        }
    }

    /// Returns the event being handled.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Returns a shared handle to the event being handled.
    pub fn event_arc(&self) -> Arc<Event> {
        Arc::clone(&self.event)
    }

    /// Returns the event text, or `""` for events without text.
    pub fn text(&self) -> &str {
        self.event.text().unwrap_or_default()
    }

    /// Returns the conversation this invocation belongs to.
    pub fn key(&self) -> &ConversationKey {
        self.event.key()
    }

    /// Returns the capture groups of the trigger pattern.
    ///
    /// Empty when the handler was reached through an armed conversation.
    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// Returns the name of the handler being invoked.
    pub fn handler_name(&self) -> &str {
        &self.handler
    }

    /// Returns `true` if the handler was invoked because it was armed for
    /// this conversation rather than through trigger matching.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Sends a reply to the conversation the event came from.
    ///
    /// Delivery failures are logged and otherwise ignored.
    pub async fn reply(&self, message: impl Into<Message>) {
        let message = message.into();
        self.replies.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.sink.reply(&self.event, message).await {
            error!(
                key = %self.event.key(),
                handler = %self.handler,
                error = %e,
                "Failed to send reply"
            );
        }
    }

    /// Returns the number of replies sent so far.
    pub fn replies_sent(&self) -> usize {
        self.replies.load(Ordering::Relaxed)
    }

    /// Arms `next` as the handler for this conversation's next event.
    pub fn start_conversation(&self, next: impl Into<String>) {
        self.set_transition(Transition::Start(next.into()));
    }

    /// Arms this handler's declared `next` for the conversation.
    ///
    /// If the handler declares no `next`, the conversation stops instead.
    pub fn advance(&self) {
        self.set_transition(Transition::Advance);
    }

    /// Returns the conversation to idle. Stopping an idle conversation is a
    /// no-op.
    pub fn stop_conversation(&self) {
        self.set_transition(Transition::Stop);
    }

    /// Returns the transition requested so far, if any.
    pub fn pending_transition(&self) -> Option<Transition> {
        self.transition.lock().clone()
    }

    pub(crate) fn take_transition(&self) -> Option<Transition> {
        self.transition.lock().take()
    }

    fn set_transition(&self, transition: Transition) {
        let mut slot = self.transition.lock();
        if let Some(previous) = slot.as_ref() {
            debug!(
                handler = %self.handler,
                ?previous,
                ?transition,
                "Replacing earlier transition"
            );
        }
        *slot = Some(transition);
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("event", &self.event)
            .field("handler", &self.handler)
            .field("armed", &self.armed)
            .field("transition", &*self.transition.lock())
            .finish_non_exhaustive()
    }
}
