use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use funnel_store::FunnelStore;

use crate::metrics::SchedulerMetrics;
use crate::queue::DelayQueue;

/// Consumer half of the scheduling engine.
///
/// Repeatedly takes the earliest pending event. If its fire time is more
/// than one poll period away the event goes back on the queue and the loop
/// sleeps for the period; otherwise the conversion is finalized against the
/// store. An event due within one period is finalized immediately rather
/// than at its exact timestamp — the contract is finalize-early-by-at-most-P,
/// which avoids per-event timers.
///
/// Under a steady stream of tied-timestamp inserts the not-yet-due head can
/// keep a later-inserted but now-due event waiting for extra poll cycles.
/// Known behavior of the poll-and-requeue protocol, left as-is.
pub struct SchedulerLoop<S> {
    queue: Arc<DelayQueue>,
    store: S,
    poll_period: Duration,
    metrics: SchedulerMetrics,
}

impl<S: FunnelStore> SchedulerLoop<S> {
    pub fn new(queue: Arc<DelayQueue>, store: S, poll_period: Duration) -> Self {
        Self {
            queue,
            store,
            poll_period,
            metrics: SchedulerMetrics::new(),
        }
    }

    /// Handle to the loop's counters; clones share state.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.clone()
    }

    /// Run until `shutdown` is notified.
    ///
    /// The only waiting points are the empty queue and the fixed sleep
    /// after a not-yet-due requeue.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        info!(poll_period_ms = self.poll_period.as_millis() as u64, "scheduler loop started");

        loop {
            let event = tokio::select! {
                event = self.queue.take_earliest() => event,
                _ = shutdown.notified() => break,
            };

            // Negative slack (already due) collapses to zero.
            let slack = (event.fire_at - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);

            if slack > self.poll_period {
                self.queue.requeue(event).await;
                self.metrics.record_requeued();

                tokio::select! {
                    _ = tokio::time::sleep(self.poll_period) => {}
                    _ = shutdown.notified() => break,
                }
            } else {
                let lead_id = event.lead.id;
                debug!(
                    lead_id,
                    amount_cents = event.amount_cents,
                    lag_ms = (Utc::now() - event.fire_at).num_milliseconds(),
                    "finalizing conversion"
                );

                // Best-effort: a failed finalize drops the conversion but
                // must not take the loop down with it.
                match self
                    .store
                    .finalize_conversion(lead_id, event.amount_cents)
                    .await
                {
                    Ok(()) => self.metrics.record_finalized(),
                    Err(e) => {
                        warn!(lead_id, error = %e, "finalize failed, conversion dropped");
                        self.metrics.record_dropped();
                    }
                }
            }
        }

        info!(
            finalized = self.metrics.finalized(),
            requeued = self.metrics.requeued(),
            dropped = self.metrics.dropped(),
            "scheduler loop stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta};
    use tokio::sync::Mutex;
    use tokio::time::timeout;

    use funnel_core::{ConversionEvent, Lead, NewLead};
    use funnel_store::StoreError;

    use super::*;

    /// Store that records finalize calls with their wall-clock time.
    struct RecordingStore {
        finalized: Mutex<Vec<(i64, i64, DateTime<Utc>)>>,
        fail_first: AtomicU32,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                finalized: Mutex::new(Vec::new()),
                fail_first: AtomicU32::new(0),
            }
        }

        fn failing_first(n: u32) -> Self {
            let store = Self::new();
            store.fail_first.store(n, Ordering::SeqCst);
            store
        }

        async fn calls(&self) -> Vec<(i64, i64, DateTime<Utc>)> {
            self.finalized.lock().await.clone()
        }
    }

    #[async_trait]
    impl FunnelStore for RecordingStore {
        async fn create_lead(&self, _lead: &NewLead) -> Result<i64, StoreError> {
            unimplemented!("scheduler loop never creates leads")
        }

        async fn finalize_conversion(
            &self,
            lead_id: i64,
            amount_cents: i64,
        ) -> Result<(), StoreError> {
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::MissingLeadId);
            }
            self.finalized
                .lock()
                .await
                .push((lead_id, amount_cents, Utc::now()));
            Ok(())
        }

        async fn create_coupon(&self, _lead_id: i64, _amount_cents: i64) -> Result<(), StoreError> {
            unimplemented!("scheduler loop never creates coupons")
        }
    }

    fn event_in_millis(millis: i64, id: i64) -> ConversionEvent {
        ConversionEvent {
            fire_at: Utc::now() + TimeDelta::milliseconds(millis),
            lead: Lead {
                id,
                email: "a@b.com".into(),
                utm_medium: "referral".into(),
                utm_source: "reddit.com".into(),
            },
            amount_cents: 2_500,
        }
    }

    async fn wait_for_finalized(metrics: &SchedulerMetrics, n: u64) {
        timeout(Duration::from_secs(10), async {
            while metrics.finalized() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("scheduler should finalize in time");
    }

    #[tokio::test]
    async fn already_due_event_skips_the_requeue_cycle() {
        let queue = Arc::new(DelayQueue::new());
        let store = Arc::new(RecordingStore::new());
        let scheduler =
            SchedulerLoop::new(queue.clone(), store.clone(), Duration::from_millis(50));
        let metrics = scheduler.metrics();
        let shutdown = Arc::new(Notify::new());

        queue.insert(event_in_millis(-1_000, 1)).await;

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        wait_for_finalized(&metrics, 1).await;
        shutdown.notify_one();
        handle.await.unwrap();

        assert_eq!(metrics.requeued(), 0, "due event must not be requeued");
        let calls = store.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 1);
    }

    #[tokio::test]
    async fn future_event_is_requeued_then_finalized_on_time() {
        let poll = Duration::from_millis(50);
        let queue = Arc::new(DelayQueue::new());
        let store = Arc::new(RecordingStore::new());
        let scheduler = SchedulerLoop::new(queue.clone(), store.clone(), poll);
        let metrics = scheduler.metrics();
        let shutdown = Arc::new(Notify::new());

        let event = event_in_millis(300, 9);
        let fire_at = event.fire_at;
        queue.insert(event).await;

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        wait_for_finalized(&metrics, 1).await;
        shutdown.notify_one();
        handle.await.unwrap();

        assert!(metrics.requeued() >= 1, "event 6 polls away must requeue");

        let calls = store.calls().await;
        let finalized_at = calls[0].2;
        // Never more than one poll period early, and not unreasonably late
        // (generous slop for scheduler jitter).
        assert!(finalized_at >= fire_at - TimeDelta::from_std(poll).unwrap());
        assert!(finalized_at <= fire_at + TimeDelta::milliseconds(150));
    }

    #[tokio::test]
    async fn finalize_failure_does_not_stop_the_loop() {
        let queue = Arc::new(DelayQueue::new());
        let store = Arc::new(RecordingStore::failing_first(1));
        let scheduler =
            SchedulerLoop::new(queue.clone(), store.clone(), Duration::from_millis(50));
        let metrics = scheduler.metrics();
        let shutdown = Arc::new(Notify::new());

        queue.insert(event_in_millis(-10, 1)).await;
        queue.insert(event_in_millis(0, 2)).await;

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        // Both events pass through the finalize step even though the first
        // store call errors.
        timeout(Duration::from_secs(10), async {
            while metrics.finalized() + metrics.dropped() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop should keep draining after a failed finalize");
        shutdown.notify_one();
        handle.await.unwrap();

        assert_eq!(metrics.dropped(), 1);
        let calls = store.calls().await;
        assert_eq!(calls.len(), 1, "failed finalize is dropped, not retried");
        assert_eq!(calls[0].0, 2);
    }
}
