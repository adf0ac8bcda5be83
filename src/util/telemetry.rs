//! Telemetry helpers for structured logging and tracing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment setting holding the log level.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Camel-case spelling of the log level setting, read when [`LOG_LEVEL_ENV`] is unset.
pub const LOG_LEVEL_ENV_ALIAS: &str = "logLevel";

/// Application name used when none is configured.
pub const DEFAULT_APP_NAME: &str = "message-relay";

/// Recognised log levels, most severe first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Unrecoverable failures. Logged at tracing's `ERROR`.
    Fatal,
    /// Failed client calls.
    Error,
    /// Dropped work.
    Warn,
    /// Per-iteration outcomes.
    Info,
    /// Hand-off details.
    Debug,
    /// Everything.
    #[default]
    Trace,
}

impl LogLevel {
    /// Parse an optional setting, falling back to [`LogLevel::Trace`] when it is
    /// unset or unrecognised.
    #[must_use]
    pub fn from_setting(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    /// Resolve the level through `lookup`, preferring [`LOG_LEVEL_ENV`] over
    /// [`LOG_LEVEL_ENV_ALIAS`].
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = lookup(LOG_LEVEL_ENV).or_else(|| lookup(LOG_LEVEL_ENV_ALIAS));
        Self::from_setting(value.as_deref())
    }

    /// Read the level from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Maximum tracing level enabled by this setting.
    #[must_use]
    pub const fn as_filter(self) -> LevelFilter {
        match self {
            Self::Fatal | Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Lowercase name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(Self::Fatal),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initialize tracing at the given level. Users can install their own subscriber;
/// this helper only installs a default fmt subscriber if none is set.
pub fn init_tracing(level: LogLevel) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level.as_filter().to_string()))
        .with_target(false)
        .try_init();
}

/// Logging context created once at startup and shared read-only with every task.
#[derive(Debug, Clone)]
pub struct LogContext {
    app: String,
}

impl LogContext {
    /// Create a context for the named application.
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }

    /// Application name attached to every task span.
    #[must_use]
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Span under which a task's log lines are emitted.
    #[must_use]
    pub fn task_span(&self, task: &'static str) -> tracing::Span {
        tracing::info_span!("relay", app = %self.app, task)
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new(DEFAULT_APP_NAME)
    }
}
