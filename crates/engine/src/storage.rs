//! Artifact storage behind a trait so the processor can be tested with an
//! in-memory store and production can swap backends without touching the
//! pipeline.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use pixora_core::types::DbId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error writing artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable home for generated artifacts.
///
/// `store` returns an opaque reference string that is persisted on the item
/// row and later handed back to clients; callers never interpret it.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(
        &self,
        execution_id: DbId,
        item_id: DbId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError>;
}

/// Local-filesystem store: one directory per execution, one file per item.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(
        &self,
        execution_id: DbId,
        item_id: DbId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let dir = self.root.join(execution_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{item_id}.{extension}"));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(
            execution_id,
            item_id,
            size_bytes = bytes.len(),
            path = %path.display(),
            "Artifact stored",
        );
        Ok(path.to_string_lossy().into_owned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
