use crate::types::DbId;

/// Domain-level error taxonomy shared by all Pixora crates.
///
/// Maps onto HTTP statuses at the API boundary: `Validation` -> 400,
/// `NotFound` -> 404, `Conflict` -> 409, `Unauthorized` -> 401,
/// `Internal` -> 500.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
