//! Error types shared across the Parley engine.
//!
//! Engine-level errors (registry and dispatch) are defined in
//! `parley-framework`; this module only holds what the outbound side needs.

use thiserror::Error;

/// Errors a [`ReplySink`](crate::ReplySink) may report.
///
/// The dispatcher never acts on these beyond logging them.
#[derive(Debug, Clone, Error)]
pub enum ReplyError {
    /// The platform connection is not available.
    #[error("reply sink is not connected")]
    NotConnected,

    /// The message could not be handed to the platform.
    #[error("failed to send reply: {0}")]
    SendFailed(String),

    /// The platform refused the message for this conversation.
    #[error("reply rejected for conversation '{key}': {reason}")]
    Rejected {
        /// Conversation the reply was addressed to.
        key: String,
        /// Reason given by the platform.
        reason: String,
    },
}

impl ReplyError {
    /// Creates a send failure from any displayable cause.
    pub fn send_failed(cause: impl std::fmt::Display) -> Self {
        Self::SendFailed(cause.to_string())
    }
}

/// Result type for reply operations.
pub type ReplyResult<T> = Result<T, ReplyError>;
