//! Engine error type.

use pixora_core::error::CoreError;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Provider and storage failures are not represented here: they are item
/// outcomes, recorded on the item row, not errors of the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
