//! # Fleetscope
//!
//! Scoped access control for a fleet of Kubernetes clusters. Given a
//! principal's resolved roles and a snapshot of the fleet's clusters and
//! namespaces, Fleetscope answers whether an operation on a resource is
//! allowed at a given cluster and namespace, materializes the effective
//! access scope of a role set, and turns that scope into search filters.
//!
//! ## Architecture
//!
//! ```text
//! Directories ─→ BuiltinChecker ─┐
//!                                ├─→ ScopeChecker ─→ allowed / effective_access_scope
//! AuthzPluginClient ─→ plugin ───┘                      ↓
//!                                               query filter / search helper
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fleetscope::domain::{resources, Access};
//! use fleetscope::sac::{for_principal, Directories, StaticDirectory};
//! use fleetscope::{Result, SacConfig, SacMetrics};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(fixture: StaticDirectory) -> Result<()> {
//! let directories = Directories::from_static(fixture);
//! let checker =
//!     for_principal(&directories, "alice", &SacConfig::default(), SacMetrics::disabled()).await?;
//!
//! let allowed = checker
//!     .access_mode(Access::ReadAccess)
//!     .resource(resources::DEPLOYMENT)
//!     .cluster_id("planet.earth")
//!     .namespace("Skunkworks")
//!     .allowed(&CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod sac;

pub use config::{InvariantPolicy, SacConfig};
pub use errors::{Result, SacError};
pub use observability::{init_observability, SacMetrics};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
