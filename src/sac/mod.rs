//! # Scoped Access Control
//!
//! Access is checked by descending a fixed hierarchy of scopes:
//!
//! ```text
//! Global → AccessMode → Resource → Cluster → Namespace
//! ```
//!
//! Each level is a [`checker::ScopeCheckerCore`] node. The built-in
//! authorizer decides from a principal's resolved roles and the effective
//! access scope of each role; the plugin checker defers to an external
//! authorization service. [`scope_checker::ScopeChecker`] is the handle
//! handed to request processing.

pub mod authorizer;
pub mod checker;
pub mod effective_access_scope;
pub mod for_resource;
pub mod labels;
pub mod plugin;
pub mod query_filter;
pub mod scope_checker;
pub mod scope_key;
pub mod search;

pub use authorizer::{BuiltinChecker, Directories, FleetSnapshot, StaticDirectory};
pub use checker::{CheckerRef, ScopeCheckerCore, TryAllowedResult};
pub use effective_access_scope::{
    compute_effective_access_scope, Detail, ScopeState, ScopeTree, ScopeTreeCompacted,
};
pub use for_resource::{for_resource, ForResource};
pub use query_filter::{build_sac_query_filter, enrich_query, Query, SearchField};
pub use scope_checker::{for_principal, with_plugin, ScopeChecker};
pub use scope_key::{keys_for, OwnedScopeKey, ScopeKey, ScopeKind};
pub use search::{ScopedResult, SearchHelper, SearchPlan};
