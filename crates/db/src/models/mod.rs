//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the operations the engine and API perform

pub mod event;
pub mod execution;
pub mod item;
pub mod status;
pub mod workflow;
