//! HTTP surface of the Pixora execution engine.
//!
//! Thin by design: handlers validate the tenant context, delegate to the
//! engine, and shape responses. All lifecycle decisions live in
//! `pixora-engine`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
