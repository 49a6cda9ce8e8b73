//! Client library for the external generative-image provider.
//!
//! Exposes the [`GenerativeProvider`] trait the engine dispatches through,
//! the request/artifact types, the transient/permanent error taxonomy, and
//! the HTTP implementation. One invocation equals exactly one provider
//! call; retry policy lives in the engine, not here.

pub mod adapter;
pub mod error;
pub mod http;

pub use adapter::{Artifact, GenerativeProvider, ProviderRequest};
pub use error::ProviderError;
pub use http::HttpProvider;
