//! Main runtime orchestration.
//!
//! [`ParleyRuntime`] ties configuration, logging, the handler registry and
//! the [`EventRouter`] together. Adapters feed it normalized [`Event`]s, either
//! one at a time through [`ParleyRuntime::dispatch`] or as a stream through
//! [`ParleyRuntime::run`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use parley_runtime::ParleyRuntime;
//!
//! let runtime = ParleyRuntime::builder()
//!     .config_file("parley.toml")
//!     .handler(greeting)
//!     .handler(help_me)
//!     .handler(help_question)
//!     .reply_sink(MySink::new())
//!     .build()?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(128);
//! spawn_adapter(tx);
//! runtime.run(rx).await?;
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use parley_core::{BoxedReplySink, Event, LogSink, ReplySink};
use parley_framework::{Dispatcher, HandlerDescriptor, HandlerRegistry};

use crate::config::{ConfigLoader, ParleyConfig, validate_config};
use crate::error::{RouteError, RuntimeError, RuntimeResult};
use crate::logging;
use crate::router::EventRouter;

/// The Parley runtime.
pub struct ParleyRuntime {
    config: ParleyConfig,
    dispatcher: Dispatcher,
    router: EventRouter,
    running: AtomicBool,
}

impl ParleyRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns the configuration the runtime was built with.
    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    /// Returns the dispatcher, for direct awaited dispatch.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the event router.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Returns whether [`run`](Self::run) is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Queues one event for dispatch and returns immediately.
    ///
    /// Events for the same conversation are handled in the order they are
    /// passed here. Events that cannot be queued are logged and dropped.
    pub fn dispatch(&self, event: Event) {
        match self.router.route(event) {
            Ok(()) => {}
            Err(RouteError::Closed) => {
                debug!("Runtime is shutting down, event dropped");
            }
            Err(e @ RouteError::QueueFull(_)) => {
                warn!(error = %e, "Event dropped");
            }
        }
    }

    /// Dispatches events from `inbound` until Ctrl+C, SIGTERM, or until every
    /// sender is dropped.
    pub async fn run(&self, inbound: mpsc::Receiver<Event>) -> RuntimeResult<()> {
        let signal = shutdown_signal()?;
        info!("Parley runtime is now running. Press Ctrl+C to stop.");
        self.run_until(inbound, signal).await
    }

    /// Dispatches events from `inbound` until `shutdown` completes or every
    /// sender is dropped, then drains queued events.
    ///
    /// A runtime runs once; after it has shut down this returns
    /// [`RuntimeError::Closed`].
    pub async fn run_until<F>(&self, mut inbound: mpsc::Receiver<Event>, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RuntimeError::AlreadyRunning);
        }
        if self.router.is_closed() {
            self.running.store(false, Ordering::Release);
            return Err(RuntimeError::Closed);
        }

        info!(
            bot = %self.config.bot.name,
            handlers = self.dispatcher.registry().len(),
            "Runtime started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = inbound.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        info!("Inbound channel closed");
                        break;
                    }
                },
            }
        }

        self.shutdown().await;
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    /// Stops accepting events and waits for in-flight conversations to
    /// finish their queued events.
    pub async fn shutdown(&self) {
        self.router.shutdown().await;
        info!("Runtime stopped");
    }
}

impl std::fmt::Debug for ParleyRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParleyRuntime")
            .field("bot", &self.config.bot.name)
            .field("dispatcher", &self.dispatcher)
            .field("router", &self.router)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Completes on Ctrl+C or, on Unix, SIGTERM.
fn shutdown_signal() -> RuntimeResult<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    Ok(async move {
        #[cfg(unix)]
        {
            tokio::select! {
                result = signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Ctrl+C handler failed");
                    }
                    info!("Received Ctrl+C");
                }
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Ctrl+C handler failed");
            }
            info!("Received Ctrl+C");
        }
    })
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`ParleyRuntime`].
///
/// Handlers are registered in the order they are added, which is the order
/// idle events are matched against them.
pub struct RuntimeBuilder {
    config: Option<ParleyConfig>,
    config_file: Option<PathBuf>,
    profile: Option<String>,
    handlers: Vec<HandlerDescriptor>,
    sink: Option<BoxedReplySink>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder that loads configuration from the default locations.
    pub fn new() -> Self {
        Self {
            config: None,
            config_file: None,
            profile: None,
            handlers: Vec::new(),
            sink: None,
            init_logging: true,
        }
    }

    /// Loads configuration from `path` instead of searching for it.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Uses an already loaded configuration; no files or environment
    /// variables are read.
    pub fn config(mut self, config: ParleyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Registers a handler.
    pub fn handler(mut self, descriptor: HandlerDescriptor) -> Self {
        self.handlers.push(descriptor);
        self
    }

    /// Registers several handlers, keeping their order.
    pub fn handlers(mut self, descriptors: impl IntoIterator<Item = HandlerDescriptor>) -> Self {
        self.handlers.extend(descriptors);
        self
    }

    /// Sets where replies are delivered.
    pub fn reply_sink(mut self, sink: impl ReplySink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets a shared reply sink.
    pub fn shared_reply_sink(mut self, sink: BoxedReplySink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads configuration, initializes logging and validates the handlers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> RuntimeResult<ParleyRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => {
                let mut loader = ConfigLoader::new();
                if let Some(path) = &self.config_file {
                    loader = loader.file(path);
                }
                if let Some(profile) = &self.profile {
                    loader = loader.profile(profile);
                }
                loader.load()?
            }
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let mut registry = HandlerRegistry::builder().limits(config.dispatch.match_limits());
        registry.extend(self.handlers);
        let registry = registry.build()?;

        let sink = self.sink.unwrap_or_else(|| {
            warn!("No reply sink configured, replies will only be logged");
            Arc::new(LogSink)
        });

        let dispatcher = Dispatcher::with_policy(registry, sink, config.dispatch.policy());
        let router = EventRouter::new(dispatcher.clone(), config.dispatch.queue_capacity);

        info!(
            bot = %config.bot.name,
            handlers = dispatcher.registry().len(),
            policy = ?dispatcher.policy(),
            "Runtime initialized from configuration"
        );

        Ok(ParleyRuntime {
            config,
            dispatcher,
            router,
            running: AtomicBool::new(false),
        })
    }
}
