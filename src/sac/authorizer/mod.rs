//! Built-in authorizer and the collaborators it is bootstrapped from.

pub mod builtin;
pub mod cache;
pub mod directory;

pub use builtin::BuiltinChecker;
pub use cache::EffectiveAccessScopeCache;
pub use directory::{
    ClusterDirectory, Directories, FleetSnapshot, NamespaceDirectory, RoleResolver,
    StaticDirectory,
};
