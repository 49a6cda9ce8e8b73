//! Shared fixtures for engine integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;

use pixora_core::types::DbId;
use pixora_core::workflow::{
    AspectRatio, OutputFormat, Resolution, WorkItemSpec, WorkflowConfig,
};
use pixora_db::repositories::WorkflowRepo;
use pixora_engine::storage::StorageError;
use pixora_engine::{ArtifactStore, QueuedItem};
use pixora_provider::{Artifact, GenerativeProvider, ProviderError, ProviderRequest};

/// Flat 12-cent cost, 50-cent revenue, generous limits.
pub fn workflow_config_json() -> serde_json::Value {
    serde_json::json!({
        "kind": "nano_banana",
        "tier": "pro",
        "pricing": {
            "cost": { "schedule": "flat", "cost_cents": 12 },
            "revenue_cents": 50,
        },
        "limits": { "max_items": 50, "max_reference_images": 4 },
    })
}

pub async fn seed_client(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO clients (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn seed_workflow(pool: &PgPool) -> DbId {
    sqlx::query_scalar("INSERT INTO workflows (name, kind, config) VALUES ($1, $2, $3) RETURNING id")
        .bind("Banana Batch")
        .bind("nano_banana")
        .bind(workflow_config_json())
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn spec(prompt: &str) -> WorkItemSpec {
    WorkItemSpec {
        prompt: Some(prompt.to_string()),
        source_image: None,
        reference_images: vec![],
        resolution: Resolution::R1k,
        aspect_ratio: AspectRatio::Square,
        output_format: OutputFormat::Png,
    }
}

/// Build the `QueuedItem` a worker would receive for one seeded item.
pub async fn queued_item(
    pool: &PgPool,
    workflow_id: DbId,
    execution_id: DbId,
    client_id: DbId,
    item_id: DbId,
    item_index: i32,
    item_spec: WorkItemSpec,
) -> QueuedItem {
    let workflow = WorkflowRepo::find_by_id(pool, workflow_id)
        .await
        .unwrap()
        .unwrap();
    let config = Arc::new(WorkflowConfig::from_value(&workflow.config).unwrap());
    QueuedItem {
        item_id,
        execution_id,
        client_id,
        item_index,
        spec: item_spec,
        config,
    }
}

pub fn artifact() -> Artifact {
    Artifact {
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
        mime: "image/png".into(),
    }
}

/// Provider returning a scripted sequence of results and counting calls.
pub struct ScriptedProvider {
    script: Mutex<Vec<Result<Artifact, ProviderError>>>,
    calls: Mutex<u32>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Artifact, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(0),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(vec![Ok(artifact())])
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GenerativeProvider for ScriptedProvider {
    async fn invoke(&self, _request: &ProviderRequest) -> Result<Artifact, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Ok(artifact());
        }
        script.remove(0)
    }
}

/// Store whose writes always fail, for the storage-failure billing paths.
pub struct FailingStore;

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn store(
        &self,
        _execution_id: DbId,
        _item_id: DbId,
        _extension: &str,
        _bytes: &[u8],
    ) -> Result<String, StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk full")))
    }
}
