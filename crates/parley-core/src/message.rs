//! Outbound message type.
//!
//! A [`Message`] is what a handler hands to the [`ReplySink`](crate::ReplySink).
//! Rendering it for a concrete platform is the sink's job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reply composed by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The message body.
    pub text: String,

    /// Optional thread the reply belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
}

impl Message {
    /// Creates a plain text message.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            thread: None,
        }
    }

    /// Sets the thread this reply should be posted in.
    pub fn in_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
