//! # Structured Logging
//!
//! Subscriber setup and span macros for access-check sessions.

use crate::config::ObservabilityConfig;
use crate::errors::{Result, SacError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Create a tracing span covering one access-check session.
///
/// ```rust,ignore
/// let span = sac_span!("list_deployments", principal = "alice");
/// ```
#[macro_export]
macro_rules! sac_span {
    ($operation:expr) => {
        tracing::info_span!(
            "sac_session",
            operation = %$operation,
            session_id = %uuid::Uuid::new_v4(),
            principal = tracing::field::Empty
        )
    };
    ($operation:expr, principal = $principal:expr) => {
        tracing::info_span!(
            "sac_session",
            operation = %$operation,
            session_id = %uuid::Uuid::new_v4(),
            principal = %$principal
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "sac_session",
            operation = %$operation,
            session_id = %uuid::Uuid::new_v4(),
            principal = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Create a debug span for an effective access scope computation
#[macro_export]
macro_rules! eas_span {
    ($access_scope_id:expr) => {
        tracing::debug_span!(
            "effective_access_scope",
            access_scope_id = %$access_scope_id,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($access_scope_id:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "effective_access_scope",
            access_scope_id = %$access_scope_id,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns an error if
/// a subscriber has already been installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| SacError::config(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logging {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| SacError::config(format!("Failed to install subscriber: {}", e)))
}

/// Log the effective configuration at startup
pub fn log_config_info(config: &crate::config::SacConfig) {
    tracing::info!(
        detail = %config.detail,
        invariant_policy = ?config.invariant_policy(),
        plugin_timeout_ms = config.plugin.timeout_ms,
        metrics_enabled = config.observability.enable_metrics,
        "Scoped access control configuration"
    );
}
