//! HTTP handler implementations.

pub mod events;
pub mod executions;
