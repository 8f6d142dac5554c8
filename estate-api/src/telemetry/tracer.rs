//! Tracing subscriber initialization.
//!
//! Structured logs go to stdout as JSON (production) or human-readable
//! lines (development). Filtering follows `RUST_LOG` when set.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "estate_api=debug,estate_storage=debug,info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(TelemetryError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid log format '{0}' (expected json or pretty)")]
    InvalidFormat(String),

    #[error("Failed to init subscriber: {0}")]
    SubscriberInit(String),
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event.
    pub service_name: String,
    /// Log line format.
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "estate-api".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl TelemetryConfig {
    /// Read `ESTATE_SERVICE_NAME` and `ESTATE_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, TelemetryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TelemetryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let log_format = match lookup("ESTATE_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };
        Ok(Self {
            service_name: lookup("ESTATE_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_format,
        })
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails with
/// [`TelemetryError::SubscriberInit`] and leaves the first subscriber in place.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    };
    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service_name = config.service_name,
        log_format = %config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}
