//! Pixora domain logic with zero internal dependencies.
//!
//! Everything in this crate is pure: no I/O, no database, no clock beyond
//! `chrono::Utc::now()`. The engine, repository layer, and API all build on
//! these types, so this crate must stay dependency-light.

pub mod error;
pub mod lifecycle;
pub mod pricing;
pub mod retry;
pub mod types;
pub mod workflow;
