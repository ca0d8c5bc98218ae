//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use parley_framework::{ConversationPolicy, MatchLimits};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ParleyConfig {
    /// Bot identity.
    #[serde(default)]
    pub bot: BotConfig,

    /// Matching limits and conversation policy.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bot identity settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    /// Display name used in greetings.
    #[serde(default = "default_bot_name")]
    pub name: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
        }
    }
}

fn default_bot_name() -> String {
    "parley".to_string()
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchConfig {
    /// Texts longer than this many bytes are never pattern-matched.
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: usize,

    /// Upper bound on the compiled size of each trigger pattern.
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,

    /// Armed conversations idle for this many seconds return to idle.
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,

    /// Armed conversations return to idle after this many armed invocations
    /// in a row that request no transition.
    #[serde(default)]
    pub max_missed_turns: Option<u32>,

    /// Maximum number of events waiting per conversation.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: default_max_text_bytes(),
            regex_size_limit: default_regex_size_limit(),
            idle_timeout_secs: None,
            max_missed_turns: None,
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DispatchConfig {
    /// Returns the limits applied when compiling and evaluating patterns.
    pub fn match_limits(&self) -> MatchLimits {
        MatchLimits {
            max_text_bytes: self.max_text_bytes,
            regex_size_limit: self.regex_size_limit,
        }
    }

    /// Returns the conversation policy.
    pub fn policy(&self) -> ConversationPolicy {
        ConversationPolicy {
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            max_missed_turns: self.max_missed_turns,
        }
    }
}

fn default_max_text_bytes() -> usize {
    MatchLimits::default().max_text_bytes
}

fn default_regex_size_limit() -> usize {
    MatchLimits::default().regex_size_limit
}

fn default_queue_capacity() -> usize {
    64
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file is rolled over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Base log level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in each line.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in each line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file path; required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Number of rotated files kept; 0 keeps all of them.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Per-module level overrides, e.g. `parley_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            filters: BTreeMap::new(),
        }
    }
}

fn default_max_files() -> usize {
    5
}
