//! Telemetry configuration from environment variables.

use std::env;

pub const LOG_ENV: &str = "SAFE_SYNC_LOG";
pub const JSON_LOGS_ENV: &str = "SAFE_SYNC_JSON_LOGS";

/// Configuration for logging and run metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to metrics.
    pub service_name: String,

    /// `EnvFilter` directive, e.g. `info` or `safe_sync=debug,info`.
    pub log_level: String,

    /// Emit one JSON object per event instead of human-readable lines.
    pub json_logs: bool,

    /// Include source file and line in each event.
    pub with_location: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "safe-sync".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            with_location: false,
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SAFE_SYNC_LOG` or `RUST_LOG`: filter directive (default: info)
    /// - `SAFE_SYNC_JSON_LOGS`: JSON output (default: true under CI)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let in_ci = lookup("CI").is_some_and(|v| truthy(&v));
        let json_logs = lookup(JSON_LOGS_ENV).map_or(in_ci, |v| truthy(&v));
        Self {
            log_level: lookup(LOG_ENV)
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
            json_logs,
            with_location: json_logs,
            ..Self::default()
        }
    }
}
