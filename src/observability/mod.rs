//! # Observability Infrastructure
//!
//! Structured logging and decision metrics for the access control engine.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::SacMetrics;

use crate::config::ObservabilityConfig;
use crate::errors::Result;

/// Initialize logging and return a metrics recorder matching the configuration
pub fn init_observability(config: &ObservabilityConfig) -> Result<SacMetrics> {
    init_logging(config)?;

    tracing::info!(
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_enabled = config.enable_metrics,
        "Observability initialized successfully"
    );

    Ok(SacMetrics::new(config.enable_metrics))
}
