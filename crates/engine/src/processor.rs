//! Drives one work item from claim to a terminal state.
//!
//! The processor owns the claim, the provider retry loop, pricing, and the
//! artifact write. It never touches the parent execution; the coordinator
//! aggregates from item outcomes.

use std::sync::Arc;

use sqlx::PgPool;

use pixora_core::pricing::{self, ItemPrice};
use pixora_core::retry::RetryPolicy;
use pixora_core::workflow::{WorkItemSpec, WorkflowConfig};
use pixora_db::repositories::ItemRepo;
use pixora_provider::{Artifact, GenerativeProvider, ProviderError, ProviderRequest};

use crate::error::EngineError;
use crate::queue::QueuedItem;
use crate::storage::ArtifactStore;

/// How processing one item ended.
#[derive(Debug)]
pub enum ItemOutcome {
    Completed {
        result_reference: String,
        price: ItemPrice,
        retries: u32,
    },
    Failed {
        error: String,
        retries: u32,
        /// Provider cost charged despite the failure (storage-failure path
        /// with charging enabled); zero otherwise.
        charged_cents: i64,
    },
    /// The claim missed: another worker holds the item or it is already
    /// terminal. Redelivery is a no-op.
    Skipped,
}

pub struct ItemProcessor {
    pool: PgPool,
    provider: Arc<dyn GenerativeProvider>,
    store: Arc<dyn ArtifactStore>,
    retry: RetryPolicy,
    charge_on_storage_failure: bool,
}

impl ItemProcessor {
    pub fn new(
        pool: PgPool,
        provider: Arc<dyn GenerativeProvider>,
        store: Arc<dyn ArtifactStore>,
        retry: RetryPolicy,
        charge_on_storage_failure: bool,
    ) -> Self {
        Self {
            pool,
            provider,
            store,
            retry,
            charge_on_storage_failure,
        }
    }

    /// Process one queued item to a terminal state.
    ///
    /// Returns [`ItemOutcome::Skipped`] without side effects when the
    /// atomic claim misses, so duplicate deliveries are harmless.
    pub async fn process(&self, queued: &QueuedItem) -> Result<ItemOutcome, EngineError> {
        let Some(item) = ItemRepo::claim(&self.pool, queued.item_id).await? else {
            tracing::debug!(
                item_id = queued.item_id,
                execution_id = queued.execution_id,
                "Claim missed, item already claimed or terminal",
            );
            return Ok(ItemOutcome::Skipped);
        };

        let request = build_provider_request(&queued.spec, &queued.config);
        let (result, retries) =
            generate_with_retry(self.provider.as_ref(), &self.retry, &request).await;

        // The claim bumped nothing; retries performed in this pass stack on
        // whatever a previous SystemFault recovery already recorded.
        let total_retries = item.retry_count + retries as i32;

        let artifact = match result {
            Ok(artifact) => artifact,
            Err(error) => {
                let message = error.to_string();
                tracing::warn!(
                    item_id = queued.item_id,
                    execution_id = queued.execution_id,
                    retries,
                    error = %message,
                    "Item failed at the provider",
                );
                ItemRepo::fail(&self.pool, queued.item_id, &message, 0, total_retries).await?;
                return Ok(ItemOutcome::Failed {
                    error: message,
                    retries,
                    charged_cents: 0,
                });
            }
        };

        let price = pricing::resolve(queued.config.pricing(), queued.spec.resolution);
        let extension = queued.spec.output_format.extension();

        match self
            .store
            .store(queued.execution_id, queued.item_id, extension, &artifact.bytes)
            .await
        {
            Ok(result_reference) => {
                ItemRepo::complete(
                    &self.pool,
                    queued.item_id,
                    &result_reference,
                    price.cost_cents,
                    price.revenue_cents,
                    total_retries,
                )
                .await?;
                tracing::info!(
                    item_id = queued.item_id,
                    execution_id = queued.execution_id,
                    retries,
                    cost_cents = price.cost_cents,
                    revenue_cents = price.revenue_cents,
                    "Item completed",
                );
                Ok(ItemOutcome::Completed {
                    result_reference,
                    price,
                    retries,
                })
            }
            Err(storage_error) => {
                // The provider call succeeded and its cost was incurred;
                // whether the tenant is billed for it is a deployment choice.
                let charged_cents = if self.charge_on_storage_failure {
                    price.cost_cents
                } else {
                    0
                };
                let message = format!("Artifact storage failed: {storage_error}");
                tracing::error!(
                    item_id = queued.item_id,
                    execution_id = queued.execution_id,
                    charged_cents,
                    error = %message,
                    "Item failed at storage after a successful generation",
                );
                ItemRepo::fail(
                    &self.pool,
                    queued.item_id,
                    &message,
                    charged_cents,
                    total_retries,
                )
                .await?;
                Ok(ItemOutcome::Failed {
                    error: message,
                    retries,
                    charged_cents,
                })
            }
        }
    }
}

/// Resolve an item spec against its workflow config into a provider call.
pub fn build_provider_request(spec: &WorkItemSpec, config: &WorkflowConfig) -> ProviderRequest {
    let mut source_images = Vec::new();
    if let Some(source) = &spec.source_image {
        source_images.push(source.clone());
    }
    source_images.extend(spec.reference_images.iter().cloned());

    ProviderRequest {
        model: config.model().to_string(),
        prompt: spec.prompt.clone().unwrap_or_default(),
        source_images,
        resolution: spec.resolution,
        aspect_ratio: spec.aspect_ratio,
        output_format: spec.output_format,
    }
}

/// Invoke the provider, retrying transient failures with jittered backoff.
///
/// Returns the final result together with the number of retries actually
/// performed. Permanent errors return immediately; transient errors retry
/// up to `retry.max_retries`, and the last error is returned verbatim when
/// the budget runs out.
pub async fn generate_with_retry(
    provider: &dyn GenerativeProvider,
    retry: &RetryPolicy,
    request: &ProviderRequest,
) -> (Result<Artifact, ProviderError>, u32) {
    let mut attempt: u32 = 0;
    loop {
        match provider.invoke(request).await {
            Ok(artifact) => return (Ok(artifact), attempt),
            Err(error) if error.is_transient() && attempt < retry.max_retries => {
                let delay = retry.jittered_delay(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient provider error, backing off",
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return (Err(error), attempt),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
