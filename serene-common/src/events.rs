//! Worker lifecycle events
//!
//! Inference workers publish their lifecycle on a shared [`EventBus`]. No
//! component restarts a worker automatically; a higher layer that wants a
//! restart policy subscribes here and reacts to [`WorkerEvent::Terminated`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle and queue events emitted by worker supervisors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    /// Subprocess spawned; not yet serving requests
    Spawned {
        worker: String,
        pid: Option<u32>,
        timestamp: DateTime<Utc>,
    },

    /// Readiness marker observed on the worker's stderr
    Ready {
        worker: String,
        timestamp: DateTime<Utc>,
    },

    /// A queued request exceeded its timeout
    RequestTimedOut {
        worker: String,
        request_id: String,
        /// Whether the request had already been written to the worker
        in_flight: bool,
        timestamp: DateTime<Utc>,
    },

    /// A response arrived for a request that had already timed out
    LateResponseDiscarded {
        worker: String,
        request_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Subprocess exited (cleanly or not)
    Terminated {
        worker: String,
        exit_code: Option<i32>,
        /// Number of pending requests rejected by the exit
        rejected: usize,
        timestamp: DateTime<Utc>,
    },

    /// Worker shut down on request
    ShutDown {
        worker: String,
        timestamp: DateTime<Utc>,
    },
}

impl WorkerEvent {
    /// Name of the worker that emitted this event
    pub fn worker(&self) -> &str {
        match self {
            WorkerEvent::Spawned { worker, .. }
            | WorkerEvent::Ready { worker, .. }
            | WorkerEvent::RequestTimedOut { worker, .. }
            | WorkerEvent::LateResponseDiscarded { worker, .. }
            | WorkerEvent::Terminated { worker, .. }
            | WorkerEvent::ShutDown { worker, .. } => worker,
        }
    }
}

/// Broadcast bus for [`WorkerEvent`]s
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use serene_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WorkerEvent,
    ) -> Result<usize, broadcast::error::SendError<WorkerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WorkerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(WorkerEvent::Ready {
            worker: "text".to_string(),
            timestamp: Utc::now(),
        });
        assert!(result.is_err());

        // Lossy variant never fails
        bus.emit_lossy(WorkerEvent::ShutDown {
            worker: "text".to_string(),
            timestamp: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(WorkerEvent::Spawned {
            worker: "text".to_string(),
            pid: Some(42),
            timestamp: Utc::now(),
        });
        bus.emit_lossy(WorkerEvent::Terminated {
            worker: "text".to_string(),
            exit_code: Some(1),
            rejected: 2,
            timestamp: Utc::now(),
        });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, WorkerEvent::Spawned { pid: Some(42), .. }));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.worker(), "text");
        assert!(matches!(second, WorkerEvent::Terminated { rejected: 2, .. }));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = WorkerEvent::LateResponseDiscarded {
            worker: "text".to_string(),
            request_id: "1-00000000".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LateResponseDiscarded");
        assert_eq!(json["request_id"], "1-00000000");
    }
}
