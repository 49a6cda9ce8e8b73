//! In-memory work queue with per-tenant admission control.
//!
//! The queue is a projection of persisted `execution_items` rows, never the
//! source of truth: anything lost here is rebuilt from the database at
//! startup. Items are admitted FIFO, except that a tenant already running
//! its ceiling of in-flight items is skipped over, so one client submitting
//! a large batch cannot starve everyone else.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use pixora_core::types::DbId;
use pixora_core::workflow::{WorkItemSpec, WorkflowConfig};

/// One dispatchable work item, carrying everything the processor needs so
/// no per-item workflow lookup happens on the hot path.
#[derive(Debug, Clone)]
pub struct QueuedItem {
    pub item_id: DbId,
    pub execution_id: DbId,
    pub client_id: DbId,
    pub item_index: i32,
    pub spec: WorkItemSpec,
    /// Parsed once at submission and shared by every item of the execution.
    pub config: Arc<WorkflowConfig>,
}

struct Inner {
    queue: VecDeque<QueuedItem>,
    /// In-flight item count per client. Entries are removed at zero so the
    /// map does not grow with tenant history.
    in_flight: HashMap<DbId, usize>,
}

/// Shared FIFO of pending items with a per-tenant in-flight ceiling.
pub struct WorkQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    per_tenant_ceiling: usize,
}

impl WorkQueue {
    pub fn new(per_tenant_ceiling: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                in_flight: HashMap::new(),
            }),
            notify: Notify::new(),
            per_tenant_ceiling: per_tenant_ceiling.max(1),
        }
    }

    /// Enqueue one item and wake parked workers.
    pub fn push(&self, item: QueuedItem) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.queue.push_back(item);
        }
        self.notify.notify_waiters();
    }

    /// Enqueue a batch, preserving order, with a single wake-up.
    pub fn push_all(&self, items: impl IntoIterator<Item = QueuedItem>) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.queue.extend(items);
        }
        self.notify.notify_waiters();
    }

    /// Take the first dispatchable item, waiting if none is available.
    ///
    /// An item is dispatchable when its tenant is below the in-flight
    /// ceiling; items of saturated tenants stay in place and keep their
    /// position. The returned item counts against its tenant until
    /// [`release`](Self::release) is called.
    pub async fn next(&self) -> QueuedItem {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // notify_waiters only reaches registered waiters, and notified()
            // registers lazily on first poll. Enable before checking so a
            // push landing between the check and the await still wakes us.
            notified.as_mut().enable();
            if let Some(item) = self.try_next() {
                return item;
            }
            notified.await;
        }
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&self) -> Option<QueuedItem> {
        let mut inner = self.inner.lock().unwrap();

        let position = inner.queue.iter().position(|item| {
            inner
                .in_flight
                .get(&item.client_id)
                .copied()
                .unwrap_or(0)
                < self.per_tenant_ceiling
        })?;

        let item = inner.queue.remove(position)?;
        *inner.in_flight.entry(item.client_id).or_insert(0) += 1;
        Some(item)
    }

    /// Return a tenant's slot after its item reached a terminal state (or
    /// was handed back), waking workers parked behind the ceiling.
    pub fn release(&self, client_id: DbId) {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(count) = inner.in_flight.get_mut(&client_id) {
                *count -= 1;
                if *count == 0 {
                    inner.in_flight.remove(&client_id);
                }
            }
        }
        self.notify.notify_waiters();
    }

    /// Drop queued items belonging to `execution_id` (cancellation path).
    /// In-flight items are unaffected.
    pub fn evict_execution(&self, execution_id: DbId) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.queue.len();
        inner.queue.retain(|item| item.execution_id != execution_id);
        before - inner.queue.len()
    }

    /// Number of items waiting (excludes in-flight).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current in-flight count for a tenant.
    pub fn in_flight(&self, client_id: DbId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .in_flight
            .get(&client_id)
            .copied()
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pixora_core::pricing::{CostSchedule, PricingTable};
    use pixora_core::workflow::{AspectRatio, Limits, ModelTier, OutputFormat, Resolution};

    use super::*;

    fn test_config() -> Arc<WorkflowConfig> {
        Arc::new(WorkflowConfig::NanoBanana {
            tier: ModelTier::Flash,
            pricing: PricingTable {
                cost: CostSchedule::Flat { cost_cents: 4 },
                revenue_cents: 20,
            },
            limits: Limits {
                max_items: 50,
                max_reference_images: 4,
            },
        })
    }

    fn item(item_id: DbId, execution_id: DbId, client_id: DbId, index: i32) -> QueuedItem {
        QueuedItem {
            item_id,
            execution_id,
            client_id,
            item_index: index,
            spec: WorkItemSpec {
                prompt: Some("a banana".into()),
                source_image: None,
                reference_images: vec![],
                resolution: Resolution::R1k,
                aspect_ratio: AspectRatio::Square,
                output_format: OutputFormat::Png,
            },
            config: test_config(),
        }
    }

    // -- FIFO ordering --

    #[test]
    fn dispatches_in_fifo_order() {
        let queue = WorkQueue::new(10);
        queue.push_all([item(1, 1, 7, 0), item(2, 1, 7, 1), item(3, 1, 7, 2)]);

        assert_eq!(queue.try_next().unwrap().item_id, 1);
        assert_eq!(queue.try_next().unwrap().item_id, 2);
        assert_eq!(queue.try_next().unwrap().item_id, 3);
        assert!(queue.try_next().is_none());
    }

    // -- admission control --

    #[test]
    fn saturated_tenant_is_skipped() {
        let queue = WorkQueue::new(1);
        queue.push_all([item(1, 1, 7, 0), item(2, 1, 7, 1), item(3, 2, 8, 0)]);

        // Tenant 7 takes its only slot; its second item is skipped over and
        // tenant 8's item dispatches instead.
        assert_eq!(queue.try_next().unwrap().item_id, 1);
        assert_eq!(queue.try_next().unwrap().item_id, 3);
        assert!(queue.try_next().is_none());

        // Releasing tenant 7 makes its parked item dispatchable again.
        queue.release(7);
        assert_eq!(queue.try_next().unwrap().item_id, 2);
    }

    #[test]
    fn skipped_item_keeps_queue_position() {
        let queue = WorkQueue::new(1);
        queue.push_all([
            item(1, 1, 7, 0),
            item(2, 1, 7, 1),
            item(3, 2, 8, 0),
            item(4, 1, 7, 2),
        ]);

        assert_eq!(queue.try_next().unwrap().item_id, 1);
        assert_eq!(queue.try_next().unwrap().item_id, 3);
        queue.release(7);
        // Item 2 dispatches before item 4: skipping did not reorder.
        assert_eq!(queue.try_next().unwrap().item_id, 2);
    }

    #[test]
    fn release_drops_zeroed_counter() {
        let queue = WorkQueue::new(2);
        queue.push(item(1, 1, 7, 0));
        let taken = queue.try_next().unwrap();
        assert_eq!(queue.in_flight(taken.client_id), 1);
        queue.release(taken.client_id);
        assert_eq!(queue.in_flight(taken.client_id), 0);
    }

    // -- waiting --

    #[tokio::test]
    async fn next_parks_until_push() {
        let queue = Arc::new(WorkQueue::new(4));

        // Nothing queued: next() must not return.
        let parked = tokio::time::timeout(Duration::from_millis(20), queue.next()).await;
        assert!(parked.is_err());

        let handle = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next().await })
        };
        // Give the worker a chance to park before pushing.
        tokio::task::yield_now().await;
        queue.push(item(9, 3, 5, 0));

        let item = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.item_id, 9);
    }

    #[tokio::test]
    async fn next_wakes_on_release() {
        let queue = Arc::new(WorkQueue::new(1));
        queue.push_all([item(1, 1, 7, 0), item(2, 1, 7, 1)]);

        let first = queue.try_next().unwrap();

        // The only remaining item belongs to the saturated tenant, so a
        // second worker parks.
        let handle = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next().await })
        };
        tokio::task::yield_now().await;

        queue.release(first.client_id);
        let second = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.item_id, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn push_racing_the_park_window_still_wakes() {
        let queue = Arc::new(WorkQueue::new(8));
        let total = 500;

        // A consumer pulling one item at a time parks whenever it outruns
        // the producer, so pushes keep landing inside the window between
        // its empty check and its await.
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for _ in 0..total {
                    let taken = queue.next().await;
                    queue.release(taken.client_id);
                }
            })
        };

        for i in 0..total {
            queue.push(item(i as DbId, 1, 7, i));
            tokio::task::yield_now().await;
        }

        // A lost wake-up leaves the consumer parked forever.
        tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .expect("consumer never saw a pushed item")
            .unwrap();
    }

    // -- eviction --

    #[test]
    fn evict_removes_only_matching_execution() {
        let queue = WorkQueue::new(10);
        queue.push_all([item(1, 1, 7, 0), item(2, 2, 7, 0), item(3, 1, 7, 1)]);

        assert_eq!(queue.evict_execution(1), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_next().unwrap().item_id, 2);
    }
}
