//! Structured logging setup and shared span/event helpers
//!
//! The library only emits events. Installing a subscriber is the CLI's job
//! and needs the `cli` feature; the span and event helpers are always there.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable whose directives replace the verbosity level
pub const FILTER_ENV: &str = "RUST_LOG";

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Colored, for terminals
    #[default]
    Console,
    /// Plain text without colors, for CI logs and pipes
    Compact,
    /// One JSON object per line
    #[cfg(feature = "tracing-json")]
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "compact" => Ok(Self::Compact),
            #[cfg(feature = "tracing-json")]
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Console => "console",
            Self::Compact => "compact",
            #[cfg(feature = "tracing-json")]
            Self::Json => "json",
        })
    }
}

/// Subscriber settings for one process
#[derive(Debug, Default)]
pub struct TracingConfig {
    /// `-v` count: 0 info, 1 debug, 2+ trace
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Explicit filter directives; take precedence over `verbosity`
    pub env_filter: Option<String>,
    /// Logged once at startup so runs can be correlated
    pub session_id: Option<String>,
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Use these directives instead of the verbosity level; blank is ignored
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        let filter = filter.into();
        self.env_filter = (!filter.trim().is_empty()).then_some(filter);
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Directives the subscriber will be built with
    #[must_use]
    pub fn filter_directives(&self) -> &str {
        self.env_filter
            .as_deref()
            .unwrap_or_else(|| self.verbosity_to_filter())
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let registry = Registry::default().with(EnvFilter::try_new(self.filter_directives())?);
        let plain = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .compact();

        match self.format {
            TracingFormat::Console => registry.with(plain.with_ansi(true)).try_init()?,
            TracingFormat::Compact => registry.with(plain.with_ansi(false)).try_init()?,
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => registry
                .with(fmt::layer().json().with_current_span(true).with_span_list(true))
                .try_init()?,
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Background removal session started");
        }
        Ok(())
    }
}

/// Install the CLI subscriber and return the new session id
///
/// `RUST_LOG`, when set, overrides the verbosity level.
///
/// # Errors
/// See [`TracingConfig::init`].
#[cfg(feature = "cli")]
pub fn init_cli_tracing(verbosity: u8, format: TracingFormat) -> anyhow::Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let mut config = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_session_id(session_id.clone());
    if let Ok(directives) = std::env::var(FILTER_ENV) {
        config = config.with_env_filter(directives);
    }
    config.init()?;

    Ok(session_id)
}

/// Span helpers
pub mod spans {
    use tracing::{Level, Span};

    /// One CLI run
    pub fn session(session_id: &str, endpoint: &str) -> Span {
        tracing::span!(Level::INFO, "session", session_id = %session_id, endpoint = %endpoint)
    }

    /// One upload's trip through the flow
    pub fn upload(file_name: &str) -> Span {
        tracing::span!(Level::INFO, "upload", file_name = %file_name)
    }
}

/// Event helpers
pub mod events {
    use tracing::{error, info};

    /// User-facing progress line
    pub fn progress(message: &str) {
        info!("{}", message);
    }

    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(error = %error, context = %context, "Operation failed");
    }
}
