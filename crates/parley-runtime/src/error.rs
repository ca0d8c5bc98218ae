//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use parley_framework::RegistryError;

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The handler table failed validation.
    #[error("Handler registry error: {0}")]
    Registry(#[from] RegistryError),

    /// `run` was called while the runtime was already running.
    #[error("Runtime is already running")]
    AlreadyRunning,

    /// `run` was called after the runtime had been shut down.
    #[error("Runtime has already been shut down")]
    Closed,

    /// A shutdown signal handler could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Reasons an event could not be queued for dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The router has been shut down.
    #[error("Router is shut down")]
    Closed,

    /// The conversation already has the maximum number of events waiting.
    #[error("Queue for conversation {0} is full")]
    QueueFull(parley_core::ConversationKey),
}
