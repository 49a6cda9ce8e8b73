//! Execution engine: admission queue, worker pool, item processing, and
//! execution lifecycle coordination.
//!
//! The engine sits between the HTTP surface and the database. The API crate
//! hands submissions to [`ExecutionCoordinator`]; a fixed pool of workers
//! pulls admitted items off the [`WorkQueue`], drives each one through the
//! generative provider with retry, and reports outcomes back to the
//! coordinator, which settles the parent execution exactly once.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod pool;
pub mod processor;
pub mod queue;
pub mod reaper;
pub mod storage;

pub use config::EngineConfig;
pub use coordinator::ExecutionCoordinator;
pub use error::EngineError;
pub use pool::WorkerPool;
pub use processor::ItemProcessor;
pub use queue::{QueuedItem, WorkQueue};
pub use storage::{ArtifactStore, FsArtifactStore};
