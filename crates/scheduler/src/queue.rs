use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::sync::{Mutex, Notify};

use funnel_core::ConversionEvent;

/// Heap entry. `Ord` delegates to [`ConversionEvent::fire_order`] reversed,
/// turning `BinaryHeap`'s max-heap into a min-heap by fire timestamp.
struct QueuedEvent(ConversionEvent);

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.0.fire_order(&other.0) == Ordering::Equal
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.fire_order(&self.0)
    }
}

/// Time-ordered queue of pending conversion events.
///
/// A min-heap keyed by fire timestamp, safe to share between the producing
/// pipeline and the consuming scheduler loop. Entries live only in process
/// memory; there is no durability across restarts.
#[derive(Default)]
pub struct DelayQueue {
    heap: Mutex<BinaryHeap<QueuedEvent>>,
    notify: Notify,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event. The fire timestamp may be in the past; a late insert
    /// is simply due immediately. Never fails, and wakes a consumer blocked
    /// in [`take_earliest`](Self::take_earliest).
    pub async fn insert(&self, event: ConversionEvent) {
        self.heap.lock().await.push(QueuedEvent(event));
        self.notify.notify_one();
    }

    /// Reinsert a previously taken event unchanged. Used by the scheduler
    /// loop when the head of the queue is not yet due.
    pub async fn requeue(&self, event: ConversionEvent) {
        self.insert(event).await;
    }

    /// Remove and return the event with the minimum fire timestamp,
    /// waiting while the queue is empty.
    ///
    /// The minimum is evaluated under the lock at the instant of removal,
    /// so a concurrent insert of an earlier event either lands before the
    /// pop (and wins) or stays queued for the next call.
    pub async fn take_earliest(&self) -> ConversionEvent {
        loop {
            // Register for a wakeup before checking the heap, so an insert
            // racing between the pop attempt and the await is not missed.
            let notified = self.notify.notified();
            if let Some(QueuedEvent(event)) = self.heap.lock().await.pop() {
                return event;
            }
            notified.await;
        }
    }

    /// Number of pending events.
    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};
    use rand::seq::SliceRandom;
    use tokio::time::timeout;

    use funnel_core::Lead;

    use super::*;

    fn event_in_millis(millis: i64, id: i64) -> ConversionEvent {
        ConversionEvent {
            fire_at: Utc::now() + TimeDelta::milliseconds(millis),
            lead: Lead {
                id,
                email: "a@b.com".into(),
                utm_medium: "email".into(),
                utm_source: "klaviyo.com".into(),
            },
            amount_cents: 1_000 + id,
        }
    }

    #[tokio::test]
    async fn takes_minimum_regardless_of_insert_order() {
        let queue = DelayQueue::new();
        let mut offsets: Vec<i64> = (0..50).map(|i| i * 10).collect();
        offsets.shuffle(&mut rand::thread_rng());

        for (i, off) in offsets.iter().enumerate() {
            queue.insert(event_in_millis(*off, i as i64)).await;
        }

        let mut last = queue.take_earliest().await;
        while !queue.is_empty().await {
            let next = queue.take_earliest().await;
            assert!(
                last.fire_at <= next.fire_at,
                "drained out of order: {} after {}",
                next.fire_at,
                last.fire_at
            );
            last = next;
        }
    }

    #[tokio::test]
    async fn take_waits_for_insert_on_empty_queue() {
        let queue = Arc::new(DelayQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.take_earliest().await })
        };

        // Give the consumer time to block on the empty queue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.insert(event_in_millis(0, 7)).await;

        let taken = timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake on insert")
            .expect("consumer task should not panic");
        assert_eq!(taken.lead.id, 7);
    }

    #[tokio::test]
    async fn requeue_returns_identical_event() {
        let queue = DelayQueue::new();
        queue.insert(event_in_millis(100, 1)).await;
        queue.insert(event_in_millis(500, 2)).await;

        let head = queue.take_earliest().await;
        assert_eq!(head.lead.id, 1);

        queue.requeue(head.clone()).await;
        assert_eq!(queue.len().await, 2);

        let again = queue.take_earliest().await;
        assert_eq!(again, head);
    }

    #[tokio::test]
    async fn earlier_insert_wins_over_requeued_head() {
        let queue = DelayQueue::new();
        queue.insert(event_in_millis(1_000, 1)).await;

        let head = queue.take_earliest().await;
        // While the head is out for evaluation, an earlier event arrives.
        queue.insert(event_in_millis(20, 2)).await;
        queue.requeue(head).await;

        assert_eq!(queue.take_earliest().await.lead.id, 2);
        assert_eq!(queue.take_earliest().await.lead.id, 1);
    }

    #[tokio::test]
    async fn concurrent_producer_and_consumer_drain_everything() {
        let queue = Arc::new(DelayQueue::new());
        const N: usize = 200;

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                for i in 0..N {
                    queue.insert(event_in_millis((i % 17) as i64, i as i64)).await;
                    if i % 10 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        };

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut seen = Vec::with_capacity(N);
                for _ in 0..N {
                    seen.push(queue.take_earliest().await.lead.id);
                }
                seen
            })
        };

        producer.await.unwrap();
        let mut seen = timeout(Duration::from_secs(5), consumer)
            .await
            .expect("consumer should drain all inserts")
            .unwrap();

        seen.sort_unstable();
        let expected: Vec<i64> = (0..N as i64).collect();
        assert_eq!(seen, expected, "every inserted event taken exactly once");
        assert!(queue.is_empty().await);
    }
}
