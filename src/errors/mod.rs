//! # Error Handling
//!
//! Every terminal access-control operation returns [`Result`]; callers that
//! need a plain boolean route errors through the fail-closed policy in
//! [`crate::config::InvariantPolicy`].

pub mod types;

pub use types::{Result, SacError};
