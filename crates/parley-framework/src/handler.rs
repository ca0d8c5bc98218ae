//! Handler system for the Parley framework.
//!
//! Handlers are plain async functions whose parameters implement
//! [`FromContext`], similar to Axum's handler system. Whatever a handler
//! returns is turned into replies through [`HandleResponse`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parley_framework::{Group, HandlerContext, Text};
//!
//! // Reply by returning a string
//! async fn greet() -> &'static str {
//!     "Hi there!"
//! }
//!
//! // Start a dialog and ask a question
//! async fn help_me(ctx: Arc<HandlerContext>) -> &'static str {
//!     ctx.start_conversation("helpQuestion");
//!     "What do you need help with?"
//! }
//!
//! // Use capture groups of the trigger pattern
//! async fn digits(number: Group<2>) -> String {
//!     format!("You sent {}", number.0)
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use parley_core::Message;

use crate::context::HandlerContext;
use crate::extractor::FromContext;

// ============================================================================
// HandleResponse - Handle handler return values
// ============================================================================

/// A trait for types that can handle handler return values.
#[async_trait]
pub trait HandleResponse: Send {
    /// Convert this value into a response.
    async fn into_response(self, ctx: &HandlerContext);
}

/// Implementation for `()` - no response needed.
#[async_trait]
impl HandleResponse for () {
    async fn into_response(self, _ctx: &HandlerContext) {}
}

/// Implementation for `String` - send it as a reply.
#[async_trait]
impl HandleResponse for String {
    async fn into_response(self, ctx: &HandlerContext) {
        ctx.reply(self).await;
    }
}

#[async_trait]
impl HandleResponse for &'static str {
    async fn into_response(self, ctx: &HandlerContext) {
        ctx.reply(self).await;
    }
}

#[async_trait]
impl HandleResponse for Message {
    async fn into_response(self, ctx: &HandlerContext) {
        ctx.reply(self).await;
    }
}

/// Implementation for `Option<T>` where T implements HandleResponse.
///
/// On Some, the inner value's response is handled. On None, no action is taken.
#[async_trait]
impl<T: HandleResponse> HandleResponse for Option<T> {
    async fn into_response(self, ctx: &HandlerContext) {
        if let Some(t) = self {
            t.into_response(ctx).await;
        }
    }
}

/// Implementation for `Result<T, E>` where T implements HandleResponse.
///
/// On Ok, the inner value's response is handled. On Err, the error is logged
/// and no reply is sent.
#[async_trait]
impl<T: HandleResponse, E: std::fmt::Display + Send> HandleResponse for Result<T, E> {
    async fn into_response(self, ctx: &HandlerContext) {
        match self {
            Ok(t) => t.into_response(ctx).await,
            Err(e) => {
                error!(handler = %ctx.handler_name(), "Handler error: {e}");
            }
        }
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for handler actions.
///
/// # Blanket Implementation
///
/// This trait is automatically implemented for async functions that:
/// - Take 0-8 parameters that implement [`FromContext`]
/// - Return a type that implements [`HandleResponse`]
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Call the handler with the given context.
    async fn call(self, ctx: Arc<HandlerContext>);
}

// ============================================================================
// BoxedAction - Type-erased handler stored in the registry
// ============================================================================

/// A type-erased handler action.
///
/// Internally a closure that captures the original handler and calls it
/// with a cloned copy on each invocation.
pub type BoxedAction = Arc<dyn Fn(Arc<HandlerContext>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Convert a handler function into a boxed action.
pub fn into_action<F, T>(f: F) -> BoxedAction
where
    F: Handler<T> + Send + Sync + 'static,
    T: 'static,
{
    Arc::new(move |ctx| f.clone().call(ctx))
}

// ============================================================================
// Handler implementations for functions (Axum-style)
// ============================================================================

/// Macro to generate Handler implementations for functions with different arities.
macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: HandleResponse + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            async fn call(self, ctx: Arc<HandlerContext>) {
                $(
                    let $ty = match $ty::from_context(&ctx) {
                        Ok(value) => value,
                        Err(e) => {
                            if ctx.is_armed() {
                                warn!(handler = %ctx.handler_name(), error = %e, "Extraction failed for armed handler, turn skipped");
                            } else {
                                debug!(handler = %ctx.handler_name(), error = %e, "Extraction failed, skipping handler");
                            }
                            return;
                        }
                    };
                )*

                let res = (self)($($ty,)*).await;
                res.into_response(&ctx).await;
            }
        }
    };
}

// Generate implementations for 0-8 parameters
impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{ConversationKey, Event, EventType, LogSink};

    use crate::extractor::Group;
    use crate::matcher::{Captures, MatchLimits, Matcher};

    fn context(captures: Captures) -> Arc<HandlerContext> {
        let event = Event::text_event(EventType::Message, ConversationKey::new("C1", "U1"), "ab12cd");
        Arc::new(HandlerContext::new(
            Arc::new(event),
            captures,
            Arc::from("digits"),
            false,
            Arc::new(LogSink),
        ))
    }

    async fn digits(number: Group<2>) -> String {
        format!("You sent {}", number.0)
    }

    async fn fallible(ctx: Arc<HandlerContext>) -> Result<&'static str, String> {
        ctx.stop_conversation();
        Err("backend unavailable".into())
    }

    #[test]
    fn test_string_response_is_sent() {
        let matcher = Matcher::compile(&[], Some(r"([a-z]+)(\d+)"), &MatchLimits::default()).unwrap();
        let captures = matcher
            .matches(&Event::text_event(EventType::Message, ConversationKey::channel("C1"), "ab12cd"))
            .unwrap();
        let ctx = context(captures);

        tokio_test::block_on(into_action(digits)(Arc::clone(&ctx)));
        assert_eq!(ctx.replies_sent(), 1);
    }

    #[test]
    fn test_missing_capture_skips_body() {
        let ctx = context(Captures::empty());

        tokio_test::block_on(into_action(digits)(Arc::clone(&ctx)));
        assert_eq!(ctx.replies_sent(), 0);
    }

    #[test]
    fn test_error_response_sends_nothing() {
        let ctx = context(Captures::empty());
        let action = into_action(fallible);

        tokio_test::block_on(action(Arc::clone(&ctx)));
        assert_eq!(ctx.replies_sent(), 0);
        assert!(ctx.pending_transition().is_some());
    }
}
