//! # Error Types
//!
//! Error taxonomy for scoped access control decisions using `thiserror`.

use std::fmt;

/// Custom result type for access control operations
pub type Result<T> = std::result::Result<T, SacError>;

/// Main error type for the scoped access control engine
#[derive(thiserror::Error, Debug)]
pub enum SacError {
    /// A key of the wrong kind was used to descend the checker hierarchy
    #[error("unexpected scope key {key} at {level} level")]
    UnexpectedScopeKey { level: String, key: String },

    /// Resource name not present in the static resource registry
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// Malformed label selector in access scope rules
    #[error("label selector computation failed: {message}")]
    SelectorComputation { message: String },

    /// Operation is not answerable by this checker variant
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Terminal denial sentinel
    #[error("access to resource denied")]
    ResourceAccessDenied,

    /// Cluster, namespace or role directory lookup failed
    #[error("directory lookup failed: {message}")]
    Directory { message: String },

    /// External authorization plugin round-trip failed
    #[error("authorization plugin error: {message}")]
    Plugin { message: String },

    /// Check was cancelled before completion
    #[error("access check cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Aggregated errors from combined checkers
    #[error("{}", MultiErrorDisplay(.0))]
    Multiple(Vec<SacError>),

    /// Invariant violations that should never happen
    #[error("internal error: {0}")]
    Internal(String),
}

struct MultiErrorDisplay<'a>(&'a [SacError]);

impl fmt::Display for MultiErrorDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred:", self.0.len())?;
        for err in self.0 {
            write!(f, "\n\t* {}", err)?;
        }
        Ok(())
    }
}

impl SacError {
    /// Create an unexpected scope key error
    pub fn unexpected_key(level: impl fmt::Display, key: impl fmt::Display) -> Self {
        Self::UnexpectedScopeKey { level: level.to_string(), key: key.to_string() }
    }

    /// Create a selector computation error
    pub fn selector<S: Into<String>>(message: S) -> Self {
        Self::SelectorComputation { message: message.into() }
    }

    /// Create a not supported error
    pub fn not_supported<S: Into<String>>(message: S) -> Self {
        Self::NotSupported(message.into())
    }

    /// Create a directory lookup error
    pub fn directory<S: Into<String>>(message: S) -> Self {
        Self::Directory { message: message.into() }
    }

    /// Create a plugin error
    pub fn plugin<S: Into<String>>(message: S) -> Self {
        Self::Plugin { message: message.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Combine errors into one, flattening nested aggregates.
    ///
    /// Returns `None` for an empty input and the bare error for a single one.
    pub fn combine(errors: Vec<SacError>) -> Option<SacError> {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                SacError::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(SacError::Multiple(flat)),
        }
    }

    /// Copy of this error. Sources that cannot be cloned are flattened into
    /// an internal error carrying the rendered message.
    pub fn replicate(&self) -> SacError {
        match self {
            SacError::UnexpectedScopeKey { level, key } => {
                SacError::UnexpectedScopeKey { level: level.clone(), key: key.clone() }
            }
            SacError::UnknownResource(name) => SacError::UnknownResource(name.clone()),
            SacError::SelectorComputation { message } => {
                SacError::SelectorComputation { message: message.clone() }
            }
            SacError::NotSupported(message) => SacError::NotSupported(message.clone()),
            SacError::ResourceAccessDenied => SacError::ResourceAccessDenied,
            SacError::Directory { message } => SacError::Directory { message: message.clone() },
            SacError::Plugin { message } => SacError::Plugin { message: message.clone() },
            SacError::Cancelled => SacError::Cancelled,
            SacError::Multiple(errors) => {
                SacError::Multiple(errors.iter().map(SacError::replicate).collect())
            }
            SacError::Internal(message) => SacError::Internal(message.clone()),
            SacError::Config { .. } | SacError::Serialization { .. } => {
                SacError::Internal(self.to_string())
            }
        }
    }

    /// Whether this is the terminal access-denied sentinel
    pub fn is_access_denied(&self) -> bool {
        matches!(self, SacError::ResourceAccessDenied)
    }

    /// Whether this error stems from a programming mistake rather than data or I/O
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            SacError::UnexpectedScopeKey { .. }
            | SacError::UnknownResource(_)
            | SacError::Internal(_) => true,
            SacError::Multiple(errors) => errors.iter().any(SacError::is_invariant_violation),
            _ => false,
        }
    }

    /// Short stable label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            SacError::UnexpectedScopeKey { .. } => "unexpected_scope_key",
            SacError::UnknownResource(_) => "unknown_resource",
            SacError::SelectorComputation { .. } => "selector_computation",
            SacError::NotSupported(_) => "not_supported",
            SacError::ResourceAccessDenied => "access_denied",
            SacError::Directory { .. } => "directory",
            SacError::Plugin { .. } => "plugin",
            SacError::Cancelled => "cancelled",
            SacError::Config { .. } => "config",
            SacError::Serialization { .. } => "serialization",
            SacError::Multiple(_) => "multiple",
            SacError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for SacError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for SacError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for SacError {
    fn from(error: validator::ValidationErrors) -> Self {
        Self::config_with_source("Configuration validation failed", Box::new(error))
    }
}
