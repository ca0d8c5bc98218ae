//! Event system for the Parley engine.
//!
//! This module provides the normalized inbound event that a platform adapter
//! hands to the dispatcher:
//!
//! - [`EventType`] - Closed classification of inbound notifications
//! - [`ConversationKey`] - The channel/user pair a conversation is scoped to
//! - [`Event`] - One immutable inbound message or notification
//!
//! # Example
//!
//! ```rust
//! use parley_core::{ConversationKey, Event, EventType};
//!
//! let event = Event::builder(EventType::Message, ConversationKey::new("C024BE91L", "U2147483697"))
//!     .text("help me")
//!     .build();
//!
//! assert_eq!(event.text(), Some("help me"));
//! assert_eq!(event.key().to_string(), "C024BE91L/U2147483697");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of inbound events.
///
/// `DirectMention` and `DirectMessage` are derived by the adapter: the
/// platform itself only reports a generic message, and the adapter decides
/// whether the bot was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Connection greeting sent by the platform.
    Hello,
    /// A channel message that mentions the bot (`@bot: ...`).
    DirectMention,
    /// A one-to-one message addressed to the bot.
    DirectMessage,
    /// Any other channel message.
    Message,
    /// An item was pinned in a channel.
    PinAdded,
    /// An item was unpinned in a channel.
    PinRemoved,
    /// A file was shared.
    FileShared,
    /// A reaction was added to an item.
    ReactionAdded,
    /// A reaction was removed from an item.
    ReactionRemoved,
    /// The bot joined a channel.
    ChannelJoined,
    /// A user is typing.
    UserTyping,
    /// Unknown or unclassified event.
    Other,
}

impl EventType {
    /// Returns the wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::DirectMention => "direct_mention",
            Self::DirectMessage => "direct_message",
            Self::Message => "message",
            Self::PinAdded => "pin_added",
            Self::PinRemoved => "pin_removed",
            Self::FileShared => "file_shared",
            Self::ReactionAdded => "reaction_added",
            Self::ReactionRemoved => "reaction_removed",
            Self::ChannelJoined => "channel_joined",
            Self::UserTyping => "user_typing",
            Self::Other => "other",
        }
    }

    /// Returns `true` for types that normally carry message text.
    pub fn is_message(&self) -> bool {
        matches!(
            self,
            Self::DirectMention | Self::DirectMessage | Self::Message
        )
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().replace('-', "_").as_str() {
            "hello" => Self::Hello,
            "direct_mention" => Self::DirectMention,
            "direct_message" => Self::DirectMessage,
            "message" => Self::Message,
            "pin_added" => Self::PinAdded,
            "pin_removed" => Self::PinRemoved,
            "file_shared" => Self::FileShared,
            "reaction_added" => Self::ReactionAdded,
            "reaction_removed" => Self::ReactionRemoved,
            "channel_joined" => Self::ChannelJoined,
            "user_typing" => Self::UserTyping,
            _ => Self::Other,
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Conversation Key
// ============================================================================

/// Identifies the conversation an event belongs to.
///
/// A key is the channel the event arrived in, optionally narrowed to the user
/// who sent it. Two users talking to the bot in the same channel therefore
/// hold independent conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    channel: String,
    user: Option<String>,
}

impl ConversationKey {
    /// Creates a key scoped to a user within a channel.
    pub fn new(channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: Some(user.into()),
        }
    }

    /// Creates a key scoped to a whole channel.
    pub fn channel(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: None,
        }
    }

    /// Returns the channel identifier.
    pub fn channel_id(&self) -> &str {
        &self.channel
    }

    /// Returns the user identifier, if the key is user-scoped.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}/{}", self.channel, user),
            None => f.write_str(&self.channel),
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// One normalized inbound event.
///
/// Events are immutable once built. The raw payload is never inspected by
/// the engine; it is passed through untouched so a reply sink can recover
/// platform details such as thread timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: EventType,
    key: ConversationKey,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    raw: Value,
}

impl Event {
    /// Starts building an event of the given type for the given conversation.
    pub fn builder(event_type: EventType, key: ConversationKey) -> EventBuilder {
        EventBuilder {
            event_type,
            key,
            text: None,
            raw: Value::Null,
        }
    }

    /// Shorthand for a text-bearing event.
    pub fn text_event(
        event_type: EventType,
        key: ConversationKey,
        text: impl Into<String>,
    ) -> Self {
        Self::builder(event_type, key).text(text).build()
    }

    /// Returns the event classification.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Returns the conversation this event belongs to.
    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    /// Returns the message text, if the event carries any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns the opaque platform payload.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Builder for [`Event`].
#[derive(Debug)]
pub struct EventBuilder {
    event_type: EventType,
    key: ConversationKey,
    text: Option<String>,
    raw: Value,
}

impl EventBuilder {
    /// Sets the message text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the raw platform payload.
    pub fn raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Finishes the event.
    pub fn build(self) -> Event {
        Event {
            event_type: self.event_type,
            key: self.key,
            text: self.text,
            raw: self.raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(
            "direct_mention".parse::<EventType>().unwrap(),
            EventType::DirectMention
        );
        assert_eq!(
            "PIN-ADDED".parse::<EventType>().unwrap(),
            EventType::PinAdded
        );
        assert_eq!("presence_change".parse::<EventType>().unwrap(), EventType::Other);
    }

    #[test]
    fn test_event_type_display_matches_serde() {
        let ty = EventType::FileShared;
        let json = serde_json::to_value(ty).unwrap();
        assert_eq!(json, json!(ty.to_string()));
    }

    #[test]
    fn test_conversation_key_display() {
        assert_eq!(ConversationKey::new("C1", "U1").to_string(), "C1/U1");
        assert_eq!(ConversationKey::channel("C1").to_string(), "C1");
        assert_ne!(ConversationKey::new("C1", "U1"), ConversationKey::new("C1", "U2"));
    }

    #[test]
    fn test_event_deserialize_without_text() {
        let event: Event = serde_json::from_value(json!({
            "type": "pin_added",
            "key": { "channel": "C1", "user": null },
        }))
        .unwrap();

        assert_eq!(event.event_type(), EventType::PinAdded);
        assert!(event.text().is_none());
        assert!(event.raw().is_null());
    }

    #[test]
    fn test_builder_keeps_raw_payload() {
        let raw = json!({ "ts": "1355517523.000005" });
        let event = Event::builder(EventType::Message, ConversationKey::channel("C1"))
            .text("hi")
            .raw(raw.clone())
            .build();

        assert_eq!(event.raw(), &raw);
        assert!(event.event_type().is_message());
    }
}
