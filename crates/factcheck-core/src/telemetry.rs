use std::sync::OnceLock;

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};

use crate::FactCheckError;
use crate::config::LoggingConfig;

static TELEMETRY_GUARD: OnceLock<()> = OnceLock::new();

/// Line layout for log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    /// One line per event with span names only; suits interactive checks.
    Compact,
}

#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    pub env_filter: Option<String>,
    pub with_ansi: bool,
    pub with_target: bool,
    pub format: LogFormat,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            env_filter: None,
            with_ansi: true,
            with_target: false,
            format: LogFormat::Full,
        }
    }
}

impl TelemetryOptions {
    /// Options from the `[logging]` section. `RUST_LOG`, when set, still wins
    /// over the configured level.
    pub fn from_logging(logging: &LoggingConfig) -> Self {
        let rust_log_set = std::env::var("RUST_LOG").is_ok_and(|v| !v.trim().is_empty());
        Self {
            env_filter: (!rust_log_set).then(|| logging.level.clone()),
            with_ansi: logging.ansi,
            with_target: false,
            format: logging.format,
        }
    }

    fn filter(&self) -> Result<EnvFilter, FactCheckError> {
        let directives = self
            .env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());
        EnvFilter::try_new(&directives).map_err(|err| {
            FactCheckError::InvalidConfiguration(format!(
                "invalid log filter `{directives}`: {err}"
            ))
        })
    }
}

/// Install the global tracing subscriber, writing to stderr so stdout stays
/// free for reports.
///
/// Only the first successful call installs anything.
pub fn init_telemetry(options: TelemetryOptions) -> Result<(), FactCheckError> {
    if TELEMETRY_GUARD.get().is_some() {
        return Ok(());
    }

    let builder = fmt::Subscriber::builder()
        .with_env_filter(options.filter()?)
        .with_ansi(options.with_ansi)
        .with_target(options.with_target)
        .with_writer(std::io::stderr);
    let installed = match options.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|err| {
        FactCheckError::InvalidConfiguration(format!("telemetry init failed: {err}"))
    })?;

    TELEMETRY_GUARD.get_or_init(|| ());
    Ok(())
}
