//! Request-context extractors.
//!
//! - [`tenant::ClientContext`]: the tenant resolved by the upstream
//!   authorization gateway.

pub mod tenant;
