//! Error types for the Parley framework.

use thiserror::Error;

/// Errors raised while validating the handler table at startup.
///
/// All of these are fatal: a registry that fails to build never accepts
/// events.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A `next` target does not name a registered handler.
    #[error("handler '{referrer}' declares next handler '{name}', which is not registered")]
    UnknownHandler {
        /// The handler whose `next` is dangling.
        referrer: String,
        /// The unresolved name.
        name: String,
    },

    /// Two descriptors share a name.
    #[error("handler '{0}' is registered more than once")]
    DuplicateHandler(String),

    /// A descriptor was registered without an action.
    #[error("handler '{0}' has no action")]
    MissingAction(String),

    /// A descriptor's pattern does not compile.
    #[error("handler '{handler}' has a malformed pattern '{pattern}': {source}")]
    MalformedPattern {
        /// The offending handler.
        handler: String,
        /// The pattern as authored.
        pattern: String,
        /// The compiler error.
        #[source]
        source: regex::Error,
    },
}

/// Result type for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while dispatching a single event.
///
/// These never escape the dispatcher. They are logged and the affected
/// conversation returns to idle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A conversation or handler referenced a name that is not registered.
    #[error("unknown handler '{0}'")]
    UnknownHandler(String),

    /// `advance()` was called from a handler that declares no `next`.
    #[error("handler '{0}' called advance() but declares no next handler")]
    NoNextHandler(String),
}

/// Result type for dispatch-time lookups.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors that can occur during handler parameter extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The event carries no text.
    #[error("event has no text")]
    MissingText,

    /// A capture group was required but did not participate in the match.
    #[error("capture group {0} is missing")]
    MissingCapture(usize),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
