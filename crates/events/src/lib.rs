//! Pixora event bus infrastructure.
//!
//! The execution engine does not log its own state transitions for
//! consumers; it publishes them here and lets subscribers (the durable
//! feed writer, and externally the audit/activity systems reading the
//! `events` table) do what they want with them.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the canonical domain event envelope.
//! - [`EventPersistence`]: background service that durably writes every
//!   event to the `events` table.

pub mod bus;
pub mod names;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use persistence::EventPersistence;
