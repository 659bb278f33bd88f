use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::event::{EventEnvelope, EventId, RunEvent};

const DEFAULT_HISTORY: usize = 256;

/// Bounded history of recently published envelopes, oldest first.
struct History {
    entries: VecDeque<EventEnvelope>,
    limit: usize,
}

impl History {
    fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    fn record(&mut self, envelope: EventEnvelope) {
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(envelope);
    }

    fn after(&self, since: EventId) -> VecDeque<EventEnvelope> {
        self.entries
            .iter()
            .filter(|envelope| envelope.id > since)
            .cloned()
            .collect()
    }

    fn for_run(&self, run_id: Uuid) -> Vec<EventEnvelope> {
        self.entries
            .iter()
            .filter(|envelope| envelope.event.run_id() == run_id)
            .cloned()
            .collect()
    }
}

/// Cloneable handle to a shared run event bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    history: Arc<Mutex<History>>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Bus keeping up to `capacity` events in history and in the live channel.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: Arc::new(Mutex::new(History::new(capacity))),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bus with the default history size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    /// Publish an event and return its sequence number. Publishing never
    /// blocks; subscribers that fall behind lose the oldest envelopes.
    pub fn publish(&self, event: RunEvent) -> EventId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        self.lock_history().record(envelope.clone());
        // No live subscribers is fine; history still holds the envelope.
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to live events. With `since`, buffered envelopes newer than
    /// that id are delivered first.
    #[must_use]
    pub fn subscribe(&self, since: Option<EventId>) -> EventStream {
        let backlog = since.map_or_else(VecDeque::new, |id| self.lock_history().after(id));
        EventStream {
            backlog,
            receiver: self.sender.subscribe(),
        }
    }

    /// Buffered events of one run, oldest first.
    #[must_use]
    pub fn replay_run(&self, run_id: Uuid) -> Vec<EventEnvelope> {
        self.lock_history().for_run(run_id)
    }

    /// Sequence number of the newest buffered event.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_history().entries.back().map(|envelope| envelope.id)
    }

    fn lock_history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of a subscription.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl EventStream {
    /// Next envelope, draining the backlog before live events. Returns `None`
    /// once the bus is gone.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    fn progress(run: u128, status: &str) -> RunEvent {
        RunEvent::StageProgress {
            run_id: Uuid::from_u128(run),
            stage: "bulk_copy".to_string(),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_backlog_precedes_live_events() {
        let bus = EventBus::with_capacity(8);
        assert_eq!(bus.last_event_id(), None);
        for status in ["started", "completed", "started"] {
            bus.publish(progress(1, status));
        }
        assert_eq!(bus.last_event_id(), Some(3));

        let mut stream = bus.subscribe(Some(1));
        assert_eq!(bus.publish(progress(1, "failed")), 4);

        let mut ids = Vec::new();
        for _ in 0..3 {
            if let Ok(Some(envelope)) = timeout(WAIT, stream.next()).await {
                ids.push(envelope.id);
            }
        }
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn history_evicts_oldest_entries() {
        let bus = EventBus::with_capacity(2);
        bus.publish(progress(1, "started"));
        bus.publish(progress(2, "started"));
        bus.publish(progress(2, "completed"));
        assert!(bus.replay_run(Uuid::from_u128(1)).is_empty());
        assert_eq!(bus.replay_run(Uuid::from_u128(2)).len(), 2);
    }

    #[test]
    fn replay_keeps_one_run_in_order() {
        let bus = EventBus::new();
        let run_id = Uuid::from_u128(9);
        bus.publish(RunEvent::RunStarted { run_id });
        bus.publish(progress(3, "started"));
        bus.publish(RunEvent::RunSucceeded { run_id, objects: 2 });

        let replayed = bus.replay_run(run_id);
        let kinds: Vec<_> = replayed.iter().map(|envelope| envelope.event.kind()).collect();
        assert_eq!(kinds, vec!["run_started", "run_succeeded"]);
        assert_eq!(
            replayed.iter().map(|envelope| envelope.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[tokio::test]
    async fn concurrent_publishers_get_unique_ids() {
        let bus = EventBus::with_capacity(64);
        let mut handles = Vec::new();
        for run in 0..4_u128 {
            let bus = bus.clone();
            handles.push(tokio::spawn(async move {
                (0..10)
                    .map(|_| bus.publish(progress(run, "started")))
                    .collect::<Vec<_>>()
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            if let Ok(batch) = handle.await {
                ids.extend(batch);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 40);
        assert_eq!(ids.last().copied(), Some(40));
    }
}
