//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. All status transitions are
//! guarded UPDATEs so the lifecycle invariants hold under concurrency.

pub mod event_repo;
pub mod execution_repo;
pub mod item_repo;
pub mod workflow_repo;

pub use event_repo::EventRepo;
pub use execution_repo::ExecutionRepo;
pub use item_repo::ItemRepo;
pub use workflow_repo::WorkflowRepo;
