//! # Safe-Sync Telemetry
//!
//! Logging and run metrics for the `safe-sync` binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sync_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let telemetry = init_telemetry(TelemetryConfig::from_env())?;
//! let _timer = telemetry.metrics.time_run();
//! // ...
//! println!("{}", telemetry.metrics.render()?);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SAFE_SYNC_LOG` | `info` | `EnvFilter` directive (falls back to `RUST_LOG`) |
//! | `SAFE_SYNC_JSON_LOGS` | `false` (`true` when `CI` is set) | JSON event output |

mod config;
mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, JSON_LOGS_ENV, LOG_ENV};
pub use logging::init_logging;
pub use metrics::{HistogramTimer, RunMetrics};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Handles produced by [`init_telemetry`].
pub struct Telemetry {
    pub config: TelemetryConfig,
    pub metrics: RunMetrics,
}

/// Install the subscriber and build the run's metrics registry.
pub fn init_telemetry(config: TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    let metrics = RunMetrics::new(&config.service_name)?;
    init_logging(&config)?;
    Ok(Telemetry { config, metrics })
}
