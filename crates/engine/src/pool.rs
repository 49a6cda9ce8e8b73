//! Fixed pool of worker tasks draining the work queue.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::coordinator::ExecutionCoordinator;
use crate::processor::ItemProcessor;
use crate::queue::{QueuedItem, WorkQueue};

pub struct WorkerPool {
    queue: Arc<WorkQueue>,
    processor: Arc<ItemProcessor>,
    coordinator: Arc<ExecutionCoordinator>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<WorkQueue>,
        processor: Arc<ItemProcessor>,
        coordinator: Arc<ExecutionCoordinator>,
        worker_count: usize,
    ) -> Self {
        Self {
            queue,
            processor,
            coordinator,
            worker_count,
        }
    }

    /// Spawn the worker tasks. They run until `cancel` is triggered; an
    /// in-flight item finishes before its worker exits.
    pub fn spawn(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        tracing::info!(worker_count = self.worker_count, "Worker pool starting");

        (0..self.worker_count)
            .map(|worker_id| {
                let queue = Arc::clone(&self.queue);
                let processor = Arc::clone(&self.processor);
                let coordinator = Arc::clone(&self.coordinator);
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    loop {
                        let queued = tokio::select! {
                            _ = cancel.cancelled() => {
                                tracing::debug!(worker_id, "Worker shutting down");
                                break;
                            }
                            queued = queue.next() => queued,
                        };

                        run_one(&processor, &coordinator, worker_id, &queued).await;
                        // The tenant slot is returned on every exit path,
                        // including panics inside run_one.
                        queue.release(queued.client_id);
                    }
                })
            })
            .collect()
    }
}

/// Process a single item, containing panics and worker-side errors.
///
/// A panic or an engine error while holding a claimed item is a system
/// fault, not an item verdict: the coordinator decides between requeue and
/// failure, and the worker keeps running either way.
async fn run_one(
    processor: &ItemProcessor,
    coordinator: &ExecutionCoordinator,
    worker_id: usize,
    queued: &QueuedItem,
) {
    if let Err(e) = coordinator
        .item_started(queued.execution_id, queued.client_id)
        .await
    {
        tracing::error!(
            worker_id,
            item_id = queued.item_id,
            error = %e,
            "Failed to mark execution started",
        );
    }

    let result = AssertUnwindSafe(processor.process(queued)).catch_unwind().await;

    let fault = match result {
        Ok(Ok(outcome)) => {
            if let Err(e) = coordinator.report_outcome(queued, &outcome).await {
                tracing::error!(
                    worker_id,
                    item_id = queued.item_id,
                    error = %e,
                    "Failed to report item outcome",
                );
            }
            return;
        }
        Ok(Err(engine_error)) => engine_error.to_string(),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(worker_id, item_id = queued.item_id, panic = %message, "Worker panicked");
            message
        }
    };

    if let Err(e) = coordinator.recover_item(queued, &fault).await {
        tracing::error!(
            worker_id,
            item_id = queued.item_id,
            error = %e,
            "Failed to recover item after a worker fault",
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_extracts_str_and_string() {
        let a: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(a.as_ref()), "boom");

        let b: Box<dyn std::any::Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(b.as_ref()), "kaboom");

        let c: Box<dyn std::any::Any + Send> = Box::new(17_i32);
        assert_eq!(panic_message(c.as_ref()), "unknown panic");
    }
}
