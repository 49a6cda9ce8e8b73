//! Execution lifecycle coordination.
//!
//! The coordinator owns every transition of the parent execution: creation,
//! the pending to processing flip, aggregation into a terminal state, and
//! cancellation. Aggregation is event driven, running only after a terminal
//! item write; the reaper is the safety net, not the primary path.

use std::sync::Arc;

use sqlx::PgPool;

use pixora_core::error::CoreError;
use pixora_core::lifecycle::{resolve_terminal, state_machine, OutputSummary, TerminalStatus};
use pixora_core::types::DbId;
use pixora_core::workflow::{validate_items, WorkItemSpec, WorkflowConfig};
use pixora_db::models::execution::Execution;
use pixora_db::models::status::ExecutionStatus;
use pixora_db::repositories::{ExecutionRepo, ItemRepo, WorkflowRepo};
use pixora_events::{names, EventBus, PlatformEvent};

use crate::error::EngineError;
use crate::processor::ItemOutcome;
use crate::queue::{QueuedItem, WorkQueue};

pub struct ExecutionCoordinator {
    pool: PgPool,
    queue: Arc<WorkQueue>,
    bus: EventBus,
    max_retries: u32,
}

impl ExecutionCoordinator {
    pub fn new(pool: PgPool, queue: Arc<WorkQueue>, bus: EventBus, max_retries: u32) -> Self {
        Self {
            pool,
            queue,
            bus,
            max_retries,
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Accept an execution request: validate, persist, enqueue.
    ///
    /// Returns as soon as the rows exist; processing happens on the worker
    /// pool. The caller polls for progress.
    pub async fn submit(
        &self,
        client_id: DbId,
        workflow_id: DbId,
        triggered_by: Option<DbId>,
        items: Vec<WorkItemSpec>,
    ) -> Result<Execution, EngineError> {
        let workflow = WorkflowRepo::find_by_id(&self.pool, workflow_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "workflow",
                id: workflow_id,
            })?;

        let config = Arc::new(WorkflowConfig::from_value(&workflow.config)?);
        validate_items(&config, &items)?;

        let input_spec = serde_json::json!({ "items": items });
        let (execution, item_ids) = ExecutionRepo::create_with_items(
            &self.pool,
            client_id,
            workflow_id,
            triggered_by,
            &input_spec,
            &items,
        )
        .await?;

        tracing::info!(
            execution_id = execution.id,
            client_id,
            workflow_id,
            item_count = items.len(),
            "Execution submitted",
        );

        let queued: Vec<QueuedItem> = item_ids
            .into_iter()
            .zip(items)
            .enumerate()
            .map(|(index, (item_id, spec))| QueuedItem {
                item_id,
                execution_id: execution.id,
                client_id,
                item_index: index as i32,
                spec,
                config: Arc::clone(&config),
            })
            .collect();
        let item_count = queued.len();
        self.queue.push_all(queued);

        let mut event = PlatformEvent::new(names::EXECUTION_SUBMITTED)
            .with_source("execution", execution.id)
            .with_client(client_id)
            .with_payload(serde_json::json!({ "item_count": item_count }));
        if let Some(user_id) = triggered_by {
            event = event.with_trigger(user_id);
        }
        self.bus.publish(event);

        Ok(execution)
    }

    // -----------------------------------------------------------------------
    // Item progress
    // -----------------------------------------------------------------------

    /// Record that an item of this execution started processing.
    ///
    /// The first caller flips the execution to processing and emits
    /// `execution.started`; later callers are no-ops thanks to the status
    /// guard in the UPDATE.
    pub async fn item_started(
        &self,
        execution_id: DbId,
        client_id: DbId,
    ) -> Result<(), EngineError> {
        let won = ExecutionRepo::mark_processing(&self.pool, execution_id).await?;
        if won {
            self.bus.publish(
                PlatformEvent::new(names::EXECUTION_STARTED)
                    .with_source("execution", execution_id)
                    .with_client(client_id),
            );
        }
        Ok(())
    }

    /// Record an item outcome and settle the execution if it was the last.
    pub async fn report_outcome(
        &self,
        queued: &QueuedItem,
        outcome: &ItemOutcome,
    ) -> Result<(), EngineError> {
        match outcome {
            ItemOutcome::Completed { retries, .. } => {
                self.bus.publish(
                    PlatformEvent::new(names::ITEM_COMPLETED)
                        .with_source("execution_item", queued.item_id)
                        .with_client(queued.client_id)
                        .with_payload(serde_json::json!({
                            "execution_id": queued.execution_id,
                            "item_index": queued.item_index,
                            "retries": retries,
                        })),
                );
            }
            ItemOutcome::Failed { error, retries, .. } => {
                self.bus.publish(
                    PlatformEvent::new(names::ITEM_FAILED)
                        .with_source("execution_item", queued.item_id)
                        .with_client(queued.client_id)
                        .with_payload(serde_json::json!({
                            "execution_id": queued.execution_id,
                            "item_index": queued.item_index,
                            "retries": retries,
                            "error": error,
                        })),
                );
            }
            // A skip means another delivery already terminalized the item;
            // that delivery also triggered aggregation.
            ItemOutcome::Skipped => return Ok(()),
        }

        self.try_finalize(queued.execution_id, queued.client_id)
            .await?;
        Ok(())
    }

    /// SystemFault path: a worker crashed or errored while holding an item.
    ///
    /// Within the retry budget the item goes back to pending and is
    /// requeued; past it, the item fails with the fault recorded.
    pub async fn recover_item(
        &self,
        queued: &QueuedItem,
        fault: &str,
    ) -> Result<(), EngineError> {
        let Some(item) = ItemRepo::find_by_id(&self.pool, queued.item_id).await? else {
            return Ok(());
        };

        if (item.retry_count as u32) < self.max_retries {
            let released = ItemRepo::release(&self.pool, queued.item_id).await?;
            if released {
                tracing::warn!(
                    item_id = queued.item_id,
                    execution_id = queued.execution_id,
                    retry_count = item.retry_count + 1,
                    fault,
                    "Item released back to the queue after a worker fault",
                );
                self.queue.push(queued.clone());
            }
            return Ok(());
        }

        let message = format!("Worker fault after {} retries: {fault}", item.retry_count);
        let failed =
            ItemRepo::fail(&self.pool, queued.item_id, &message, 0, item.retry_count).await?;
        if failed {
            tracing::error!(
                item_id = queued.item_id,
                execution_id = queued.execution_id,
                fault,
                "Item failed, worker-fault retry budget exhausted",
            );
            self.bus.publish(
                PlatformEvent::new(names::ITEM_FAILED)
                    .with_source("execution_item", queued.item_id)
                    .with_client(queued.client_id)
                    .with_payload(serde_json::json!({
                        "execution_id": queued.execution_id,
                        "item_index": queued.item_index,
                        "error": message,
                    })),
            );
            self.try_finalize(queued.execution_id, queued.client_id)
                .await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Aggregation
    // -----------------------------------------------------------------------

    /// Settle the execution if every item has reached a terminal state.
    ///
    /// Safe to call from any number of racing contexts; the guarded UPDATE
    /// picks a single winner and only the winner emits the terminal event.
    /// Returns whether this call finalized the execution.
    pub async fn try_finalize(
        &self,
        execution_id: DbId,
        client_id: DbId,
    ) -> Result<bool, EngineError> {
        let counts = ExecutionRepo::item_status_counts(&self.pool, execution_id).await?;
        if counts.total() == 0 || !counts.all_terminal() {
            return Ok(false);
        }

        let terminal = resolve_terminal(counts.completed, counts.failed);
        let financials = ExecutionRepo::financials(&self.pool, execution_id).await?;

        let summary = OutputSummary {
            total_items: counts.total(),
            completed_items: counts.completed,
            failed_items: counts.failed,
            total_cost_cents: financials.total_cost_cents,
            total_revenue_cents: financials.total_revenue_cents,
        };
        let error_message = summary.error_summary();
        let summary_json = serde_json::to_value(&summary)
            .map_err(|e| CoreError::Internal(format!("Failed to encode output summary: {e}")))?;

        let status = match terminal {
            TerminalStatus::Completed => ExecutionStatus::Completed,
            TerminalStatus::Failed => ExecutionStatus::Failed,
        };
        let won = ExecutionRepo::finalize(
            &self.pool,
            execution_id,
            status,
            &summary_json,
            error_message.as_deref(),
            financials.total_retries,
        )
        .await?;

        if won {
            tracing::info!(
                execution_id,
                status = status.name(),
                completed_items = counts.completed,
                failed_items = counts.failed,
                total_cost_cents = financials.total_cost_cents,
                total_revenue_cents = financials.total_revenue_cents,
                "Execution finalized",
            );
            let event_type = match terminal {
                TerminalStatus::Completed => names::EXECUTION_COMPLETED,
                TerminalStatus::Failed => names::EXECUTION_FAILED,
            };
            self.bus.publish(
                PlatformEvent::new(event_type)
                    .with_source("execution", execution_id)
                    .with_client(client_id)
                    .with_payload(summary_json),
            );
        }
        Ok(won)
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Cancel an execution on behalf of its tenant.
    ///
    /// Still-pending items fail with reason `cancelled`; in-flight items
    /// run to completion and the execution settles when the last of them
    /// reports. Terminal executions cannot be cancelled.
    pub async fn cancel(&self, execution_id: DbId, client_id: DbId) -> Result<(), EngineError> {
        let execution = ExecutionRepo::find_for_client(&self.pool, execution_id, client_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "execution",
                id: execution_id,
            })?;

        if state_machine::is_terminal(execution.status_id) {
            return Err(CoreError::Conflict(format!(
                "Execution {execution_id} is already terminal"
            ))
            .into());
        }

        let evicted = self.queue.evict_execution(execution_id);
        let cancelled = ItemRepo::cancel_pending(&self.pool, execution_id, "cancelled").await?;
        tracing::info!(
            execution_id,
            client_id,
            evicted,
            cancelled,
            "Execution cancel requested",
        );

        self.bus.publish(
            PlatformEvent::new(names::EXECUTION_CANCELLED)
                .with_source("execution", execution_id)
                .with_client(client_id)
                .with_payload(serde_json::json!({ "cancelled_items": cancelled })),
        );

        self.try_finalize(execution_id, client_id).await?;
        Ok(())
    }

    /// Time out an overdue execution (reaper path).
    ///
    /// Pending items fail with a timeout reason; anything still processing
    /// is left to finish and will trigger the final settle itself. Also
    /// fires finalize directly, covering the case where every item is
    /// already terminal but the finalize trigger was lost.
    pub async fn reap(&self, execution_id: DbId) -> Result<(), EngineError> {
        let Some(execution) = ExecutionRepo::find_by_id(&self.pool, execution_id).await? else {
            return Ok(());
        };
        if state_machine::is_terminal(execution.status_id) {
            return Ok(());
        }

        let evicted = self.queue.evict_execution(execution_id);
        let cancelled =
            ItemRepo::cancel_pending(&self.pool, execution_id, "execution timed out").await?;
        if evicted > 0 || cancelled > 0 {
            tracing::warn!(
                execution_id,
                evicted,
                cancelled,
                "Timed out pending items of an overdue execution",
            );
        }

        self.try_finalize(execution_id, execution.client_id).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Startup recovery
    // -----------------------------------------------------------------------

    /// Rebuild the in-memory queue from the database after a restart.
    ///
    /// Items orphaned in processing by a crash are reset to pending first,
    /// then every pending item of a non-terminal execution is re-enqueued.
    /// Returns the number of items put back on the queue.
    pub async fn resume_incomplete(&self) -> Result<usize, EngineError> {
        let orphaned = ItemRepo::reset_orphaned(&self.pool).await?;
        if !orphaned.is_empty() {
            tracing::warn!(
                count = orphaned.len(),
                "Reset orphaned processing items to pending",
            );
        }

        let mut requeued = 0;
        for execution_id in ExecutionRepo::find_incomplete(&self.pool).await? {
            let Some(execution) = ExecutionRepo::find_by_id(&self.pool, execution_id).await?
            else {
                continue;
            };
            let Some(workflow) =
                WorkflowRepo::find_by_id(&self.pool, execution.workflow_id).await?
            else {
                tracing::error!(
                    execution_id,
                    workflow_id = execution.workflow_id,
                    "Workflow missing for incomplete execution, skipping recovery",
                );
                continue;
            };
            let config = Arc::new(WorkflowConfig::from_value(&workflow.config)?);

            let pending = ItemRepo::list_pending_for_execution(&self.pool, execution_id).await?;
            let mut queued = Vec::with_capacity(pending.len());
            for item in pending {
                let spec: WorkItemSpec = serde_json::from_value(item.spec).map_err(|e| {
                    CoreError::Internal(format!(
                        "Stored spec for item {} is unreadable: {e}",
                        item.id
                    ))
                })?;
                queued.push(QueuedItem {
                    item_id: item.id,
                    execution_id,
                    client_id: execution.client_id,
                    item_index: item.item_index,
                    spec,
                    config: Arc::clone(&config),
                });
            }
            requeued += queued.len();
            self.queue.push_all(queued);

            // Nothing pending and nothing processing means the crash hit
            // between the last item write and finalize. Settle it now.
            self.try_finalize(execution_id, execution.client_id).await?;
        }

        if requeued > 0 {
            tracing::info!(requeued, "Re-enqueued pending items from previous run");
        }
        Ok(requeued)
    }
}
