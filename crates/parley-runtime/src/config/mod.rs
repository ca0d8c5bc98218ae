//! Configuration module for the Parley runtime.
//!
//! Configuration is layered with figment. Built-in defaults sit at the
//! bottom, then any programmatic base, then TOML/YAML files, and `PARLEY_*`
//! environment variables on top.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    ParleyConfig, SpanEventConfig,
};
pub use validation::validate_config;
