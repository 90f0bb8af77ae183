//! # Settings
//!
//! Engine settings with validation. Values come from defaults, an optional
//! configuration file, and `FLEETSCOPE__`-prefixed environment variables.

use crate::errors::{Result, SacError};
use crate::sac::effective_access_scope::Detail;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// How a boolean-returning API reacts to an invariant violation (wrong key
/// kind, unknown resource, internal error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantPolicy {
    /// Log the violation and answer "denied"
    Deny,
    /// Abort loudly; intended for tests and development builds
    Panic,
}

impl Default for InvariantPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            InvariantPolicy::Panic
        } else {
            InvariantPolicy::Deny
        }
    }
}

/// Top level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SacConfig {
    /// Attribute richness of trees computed by the built-in authorizer
    pub detail: Detail,

    /// Escalate invariant violations to panics instead of denials
    pub strict_invariants: Option<bool>,

    /// External authorization plugin settings
    #[validate(nested)]
    pub plugin: PluginConfig,

    /// Logging and metrics settings
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl Default for SacConfig {
    fn default() -> Self {
        Self {
            detail: Detail::Minimal,
            strict_invariants: None,
            plugin: PluginConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl SacConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Environment variables use the `FLEETSCOPE` prefix with `__` as the
    /// nesting separator, e.g. `FLEETSCOPE__PLUGIN__TIMEOUT_MS=500`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FLEETSCOPE").prefix_separator("__").separator("__"),
        );

        let settings: SacConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Build configuration from flat `FLEETSCOPE_*` environment variables
    pub fn from_env() -> Self {
        let detail = std::env::var("FLEETSCOPE_DETAIL")
            .ok()
            .and_then(|s| s.parse::<Detail>().ok())
            .unwrap_or(Detail::Minimal);
        let strict_invariants =
            std::env::var("FLEETSCOPE_STRICT_INVARIANTS").ok().and_then(|s| s.parse().ok());

        Self {
            detail,
            strict_invariants,
            plugin: PluginConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SacError::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        let level = self.observability.log_level.to_ascii_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            return Err(SacError::config(format!(
                "Unsupported log level '{}'",
                self.observability.log_level
            )));
        }
        Ok(())
    }

    /// The effective invariant policy
    pub fn invariant_policy(&self) -> InvariantPolicy {
        match self.strict_invariants {
            Some(true) => InvariantPolicy::Panic,
            Some(false) => InvariantPolicy::Deny,
            None => InvariantPolicy::default(),
        }
    }
}

/// External authorization plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PluginConfig {
    /// Upper bound for one batched round-trip
    #[validate(range(
        min = 1,
        max = 60000,
        message = "Plugin timeout must be between 1 and 60000 milliseconds"
    ))]
    pub timeout_ms: u64,

    /// Maximum number of scopes sent in one request
    #[validate(range(min = 1, message = "Plugin batch size must be at least 1"))]
    pub max_batch_size: usize,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000, max_batch_size: 1000 }
    }
}

impl PluginConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: std::env::var("FLEETSCOPE_PLUGIN_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            max_batch_size: std::env::var("FLEETSCOPE_PLUGIN_MAX_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_batch_size),
        }
    }

    /// Get the round-trip timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Record decision metrics through the `metrics` facade
    pub enable_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false, enable_metrics: true }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("FLEETSCOPE_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: std::env::var("FLEETSCOPE_JSON_LOGGING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.json_logging),
            enable_metrics: std::env::var("FLEETSCOPE_ENABLE_METRICS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.enable_metrics),
        }
    }
}
