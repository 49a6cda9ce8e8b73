//! Canonical event-type names emitted by the execution engine.

/// An execution was accepted and its items enqueued.
pub const EXECUTION_SUBMITTED: &str = "execution.submitted";
/// The first item of an execution began processing.
pub const EXECUTION_STARTED: &str = "execution.started";
/// An execution finalized with at least one completed item.
pub const EXECUTION_COMPLETED: &str = "execution.completed";
/// An execution finalized with every item failed.
pub const EXECUTION_FAILED: &str = "execution.failed";
/// A cancel request failed an execution's pending items.
pub const EXECUTION_CANCELLED: &str = "execution.cancelled";

/// One item produced and stored an artifact.
pub const ITEM_COMPLETED: &str = "item.completed";
/// One item reached its failed state.
pub const ITEM_FAILED: &str = "item.failed";
