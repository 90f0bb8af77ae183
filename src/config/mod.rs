//! # Configuration Management
//!
//! Settings for the access control engine, validated with `validator` and
//! layered through the `config` crate.

pub mod settings;

pub use settings::{InvariantPolicy, ObservabilityConfig, PluginConfig, SacConfig};
