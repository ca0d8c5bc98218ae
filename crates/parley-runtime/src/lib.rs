//! Parley Runtime - orchestration layer for the Parley conversation engine.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `ParleyConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - Per-conversation ordered event routing (`EventRouter`)
//! - Runtime lifecycle with graceful shutdown (`ParleyRuntime`)
//!
//! ```ignore
//! use parley_runtime::ParleyRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ParleyRuntime::builder()
//!         .handler(greeting)
//!         .reply_sink(ConsoleSink)
//!         .build()?;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(128);
//!     spawn_adapter(tx);
//!
//!     // Run until Ctrl+C
//!     runtime.run(rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod router;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, ParleyConfig};
pub use error::{RouteError, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use router::EventRouter;
pub use runtime::{ParleyRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports of the logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
