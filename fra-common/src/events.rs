//! Event types for the FRA event system
//!
//! Provides shared event definitions and the EventBus used by the
//! reconciliation and decision-support services.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// FRA event types
///
/// Events are broadcast via EventBus and can be serialized for downstream
/// consumers. All events carry their emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FraEvent {
    /// A claim record was written by reconciliation
    ///
    /// Emitted for inserts and for merges that changed at least one field.
    /// A merge that contributed nothing new emits no event.
    ClaimReconciled {
        /// Claim UUID that was written
        claim_id: Uuid,
        /// "inserted" or "updated"
        operation: String,
        /// Field names written, empty for inserts
        changed_fields: Vec<String>,
        /// Where the incoming record came from
        source: String,
        /// When the write happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A score resync run began
    ResyncStarted {
        /// When the run began
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Snapshot rows were imported into the score store
    ScoresImported {
        /// Rows newly inserted
        inserted: usize,
        /// Rows that replaced an existing claim entry
        updated: usize,
        /// Rows skipped because of per-row failures
        errors: usize,
        /// When the import finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A score resync run finished successfully
    ResyncCompleted {
        /// Rows newly inserted
        inserted: usize,
        /// Rows that replaced an existing claim entry
        updated: usize,
        /// Rows skipped because of per-row failures
        errors: usize,
        /// When the run finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A score resync run failed before the store was refreshed
    ResyncFailed {
        /// Why the run failed
        reason: String,
        /// When the failure was detected
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl FraEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            FraEvent::ClaimReconciled { .. } => "ClaimReconciled",
            FraEvent::ResyncStarted { .. } => "ResyncStarted",
            FraEvent::ScoresImported { .. } => "ScoresImported",
            FraEvent::ResyncCompleted { .. } => "ResyncCompleted",
            FraEvent::ResyncFailed { .. } => "ResyncFailed",
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use fra_common::events::{EventBus, FraEvent};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(1000));
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(FraEvent::ResyncStarted {
///     timestamp: chrono::Utc::now(),
/// });
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FraEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Capacity is the number of events buffered before old events are
    /// dropped for lagging subscribers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<FraEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: FraEvent) -> Result<usize, broadcast::error::SendError<FraEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used for events where it's acceptable if no component is currently
    /// listening.
    pub fn emit_lossy(&self, event: FraEvent) {
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
