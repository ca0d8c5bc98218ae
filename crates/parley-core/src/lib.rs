//! # Parley Core
//!
//! Foundation types for the Parley conversational dispatch engine.
//!
//! This crate holds the types that cross the boundary between a platform
//! adapter and the engine:
//!
//! - **Inbound**: [`Event`], its [`EventType`] and [`ConversationKey`]
//! - **Outbound**: [`Message`] and the [`ReplySink`] trait
//!
//! ```text
//! ┌─────────────┐  Event   ┌────────────┐  Message  ┌───────────┐
//! │   Adapter   │─────────▶│ Dispatcher │──────────▶│ ReplySink │
//! └─────────────┘          └────────────┘           └───────────┘
//! ```

pub mod error;
pub mod event;
pub mod message;
pub mod sink;

pub use error::{ReplyError, ReplyResult};
pub use event::{ConversationKey, Event, EventBuilder, EventType};
pub use message::Message;
pub use sink::{BoxedReplySink, LogSink, ReplySink};
