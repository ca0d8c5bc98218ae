//! Extractor system for the Parley framework.
//!
//! This module provides the [`FromContext`] trait, which defines how types
//! can be extracted from a [`HandlerContext`] for use as handler parameters.

use std::sync::Arc;

use parley_core::{ConversationKey, Event, EventType};

use crate::context::HandlerContext;
use crate::error::{ExtractError, ExtractResult};
use crate::matcher::Captures;

/// A trait for types that can be extracted from a [`HandlerContext`].
///
/// Types implementing this trait can be used directly as handler function
/// parameters. If extraction fails, the handler body is skipped for that
/// event and the conversation state is left as found.
///
/// # Example
///
/// ```rust,ignore
/// use parley_framework::{ExtractError, ExtractResult, FromContext, HandlerContext};
///
/// struct Number(u64);
///
/// impl FromContext for Number {
///     fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
///         ctx.text().trim().parse().map(Number).map_err(ExtractError::custom)
///     }
/// }
/// ```
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self>;
}

/// The full context, for handlers that reply or change conversation state.
impl FromContext for Arc<HandlerContext> {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

impl FromContext for Arc<Event> {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        Ok(ctx.event_arc())
    }
}

impl FromContext for Captures {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        Ok(ctx.captures().clone())
    }
}

impl FromContext for EventType {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        Ok(ctx.event().event_type())
    }
}

impl FromContext for ConversationKey {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        Ok(ctx.key().clone())
    }
}

/// Implementation for `Option<T>` where `T: FromContext`.
///
/// This allows handlers to have optional parameters that may or may not
/// be extractable from the context.
impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

/// The message text. Extraction fails for events without text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text(pub String);

impl FromContext for Text {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        ctx.event()
            .text()
            .map(|t| Text(t.to_string()))
            .ok_or(ExtractError::MissingText)
    }
}

impl std::ops::Deref for Text {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Capture group `N` of the trigger pattern.
///
/// Extraction fails when the group did not participate in the match, or when
/// the handler was reached through an armed conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<const N: usize>(pub String);

impl<const N: usize> FromContext for Group<N> {
    fn from_context(ctx: &Arc<HandlerContext>) -> ExtractResult<Self> {
        ctx.captures()
            .get(N)
            .map(|g| Group(g.to_string()))
            .ok_or(ExtractError::MissingCapture(N))
    }
}
