//! # Parley Framework
//!
//! The conversation engine: handlers, trigger matching and per-conversation
//! state.
//!
//! This layer provides:
//! - [`HandlerDescriptor`] and the [`handler!`] macro for declaring handlers
//! - [`HandlerRegistry`], the validated, ordered handler table
//! - Axum-style handler functions with [`FromContext`] extractors
//! - [`Dispatcher`], which routes each event to an armed handler or the first
//!   matching trigger and applies the transition the handler requests
//!
//! Adapters and process lifecycle live in `parley-runtime`.

pub mod context;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod matcher;
pub mod registry;
pub mod store;

pub use context::{HandlerContext, Transition};
pub use descriptor::{HandlerDescriptor, on_direct, on_event_type, on_message, on_pattern};
pub use dispatcher::{ConversationPolicy, ConversationState, Dispatcher, Outcome};
pub use error::{
    DispatchError, DispatchResult, ExtractError, ExtractResult, RegistryError, RegistryResult,
};
pub use extractor::{FromContext, Group, Text};
pub use handler::{BoxedAction, HandleResponse, Handler, into_action};
pub use matcher::{Captures, MatchLimits, Matcher};
pub use registry::{HandlerRegistry, RegisteredHandler, RegistryBuilder};
pub use store::{ArmedHandler, ConversationSlot, ConversationStore, SlotGuard};
