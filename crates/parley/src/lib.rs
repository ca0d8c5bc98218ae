//! # Parley
//!
//! A deterministic conversational dispatcher for chat bots.
//!
//! ## Overview
//!
//! Parley routes each inbound chat event to exactly one handler. A handler is
//! either selected by its trigger (event types plus an optional pattern) or,
//! while a multi-turn dialog is in progress, because it was armed for that
//! conversation by the previous handler.
//!
//! ```text
//! ┌─────────────┐  Event  ┌─────────────┐     ┌────────────┐     ┌───────────┐
//! │   Adapter   │────────▶│ EventRouter │────▶│ Dispatcher │────▶│ ReplySink │
//! └─────────────┘         │ (per key)   │     │  registry  │     └───────────┘
//!                         └─────────────┘     │  + store   │
//!                                             └────────────┘
//! ```
//!
//! - **Adapters** normalize platform payloads into [`Event`](core::Event)s
//! - **Router** keeps per-conversation arrival order
//! - **Dispatcher** picks the armed handler or the first matching trigger and
//!   applies the transition the handler requests
//! - **Handlers** are plain async functions (Axum-style)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley::prelude::*;
//!
//! async fn help_me(ctx: Arc<HandlerContext>) -> &'static str {
//!     ctx.advance();
//!     "What do you need help with?"
//! }
//!
//! async fn help_question(ctx: Arc<HandlerContext>, text: Text) -> String {
//!     ctx.stop_conversation();
//!     format!("Looking into: {}", &*text)
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ParleyRuntime::builder()
//!         .handler(on_pattern("helpMe", "(help me)").next("helpQuestion").handler(help_me))
//!         .handler(HandlerDescriptor::new("helpQuestion").handler(help_question))
//!         .reply_sink(LogSink)
//!         .build()?;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(128);
//!     spawn_adapter(tx);
//!     runtime.run(rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use parley_core as core;
pub use parley_framework as framework;
pub use parley_runtime as runtime;

pub use parley_framework::handler;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use parley::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime - main entry point
    pub use parley_runtime::{ParleyConfig, ParleyRuntime, RuntimeBuilder, RuntimeError};

    // Core data model
    pub use parley_core::{
        BoxedReplySink, ConversationKey, Event, EventType, LogSink, Message, ReplyError,
        ReplyResult, ReplySink,
    };

    // Handlers and dispatch
    pub use parley_framework::{
        Captures, ConversationPolicy, ConversationState, Dispatcher, FromContext, Group,
        HandlerContext, HandlerDescriptor, HandlerRegistry, Outcome, Text, on_direct,
        on_event_type, on_message, on_pattern,
    };

    // Logging macros
    pub use parley_runtime::prelude::*;

    // Async trait support for custom sinks
    pub use async_trait::async_trait;
}
