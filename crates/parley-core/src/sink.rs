//! The outbound side of the engine.
//!
//! The engine does not know how to talk to a platform. It hands composed
//! replies to a [`ReplySink`] provided by the adapter and moves on.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::ReplyResult;
use crate::event::Event;
use crate::message::Message;

/// Accepts replies addressed to the conversation an event came from.
///
/// Implementations should hand the message off (e.g. push it onto an
/// outbound queue) rather than wait for delivery confirmation; the
/// dispatcher awaits this call while it holds the conversation lock.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Sends `message` to the conversation `event` originated from.
    async fn reply(&self, event: &Event, message: Message) -> ReplyResult<()>;
}

/// A shared, type-erased reply sink.
pub type BoxedReplySink = Arc<dyn ReplySink>;

/// A sink that only writes replies to the log.
///
/// Useful when running the engine without a platform connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ReplySink for LogSink {
    async fn reply(&self, event: &Event, message: Message) -> ReplyResult<()> {
        info!(key = %event.key(), text = %message.text, "Reply");
        Ok(())
    }
}

#[async_trait]
impl<S: ReplySink + ?Sized> ReplySink for Arc<S> {
    async fn reply(&self, event: &Event, message: Message) -> ReplyResult<()> {
        (**self).reply(event, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConversationKey, EventType};

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let sink: BoxedReplySink = Arc::new(LogSink);
        let event = Event::text_event(EventType::Message, ConversationKey::channel("C1"), "hi");
        assert!(sink.reply(&event, Message::new("hello")).await.is_ok());
    }
}
