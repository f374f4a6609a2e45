//! Event emission system.
//!
//! Events are pushed from the daemon to RPC subscribers as JSON-RPC
//! notifications. Each subscriber has an independent buffer with
//! backpressure at 1000 events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use resonate_publish::{EventLog, ProgressObserver, PublishStage, Severity};

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "PublishProgress", "DaemonStarted").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "publish", "library", "system".
    pub categories: Option<Vec<String>>,
    /// Filter to specific draft ids.
    pub draft_ids: Option<Vec<String>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref categories) = self.categories {
            let event_category = categorize_event(&event.event_type);
            if !categories.contains(&event_category) {
                return false;
            }
        }

        if let Some(ref draft_ids) = self.draft_ids {
            if let Some(id) = event.payload.get("draft_id").and_then(|v| v.as_str()) {
                if !draft_ids.iter().any(|d| d == id) {
                    return false;
                }
            }
        }

        true
    }
}

/// Categorize an event type into a category.
fn categorize_event(event_type: &str) -> String {
    match event_type {
        s if s.starts_with("Publish") => "publish".to_string(),
        s if s.starts_with("Draft") || s.starts_with("Artist") => "library".to_string(),
        _ => "system".to_string(),
    }
}

/// Observer that keeps the per-run history and mirrors every progress
/// event onto the daemon bus.
pub struct ProgressBridge {
    draft_id: Uuid,
    log: Arc<EventLog>,
    bus: EventBus,
}

impl ProgressBridge {
    pub fn new(draft_id: Uuid, log: Arc<EventLog>, bus: EventBus) -> Self {
        Self { draft_id, log, bus }
    }
}

impl ProgressObserver for ProgressBridge {
    fn notify(&self, stage: PublishStage, message: &str, severity: Severity) {
        self.log.notify(stage, message, severity);
        self.bus.emit(Event {
            event_type: "PublishProgress".to_string(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            payload: serde_json::json!({
                "draft_id": self.draft_id.to_string(),
                "stage": stage.as_str(),
                "message": message,
                "severity": severity.as_str(),
            }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(Event {
            event_type: "DaemonStarted".to_string(),
            timestamp: 1000,
            payload: serde_json::json!({"version": "0.1.0"}),
        });

        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.event_type, "DaemonStarted");
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_event_filter_categories() {
        let filter = EventFilter {
            categories: Some(vec!["publish".to_string()]),
            draft_ids: None,
        };

        let publish_event = Event {
            event_type: "PublishProgress".to_string(),
            timestamp: 1000,
            payload: serde_json::json!({}),
        };
        assert!(filter.matches(&publish_event));

        let library_event = Event {
            event_type: "DraftSaved".to_string(),
            timestamp: 1000,
            payload: serde_json::json!({}),
        };
        assert!(!filter.matches(&library_event));
    }

    #[test]
    fn test_categorize_event() {
        assert_eq!(categorize_event("PublishProgress"), "publish");
        assert_eq!(categorize_event("DraftSaved"), "library");
        assert_eq!(categorize_event("ArtistProvisioned"), "library");
        assert_eq!(categorize_event("DaemonStarted"), "system");
    }

    #[test]
    fn test_progress_bridge_mirrors_to_bus_and_log() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let log = Arc::new(EventLog::new());
        let draft_id = Uuid::new_v4();
        let bridge = ProgressBridge::new(draft_id, log.clone(), bus);

        bridge.notify(PublishStage::Validating, "checking", Severity::Info);

        assert_eq!(log.events().len(), 1);
        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.event_type, "PublishProgress");
        assert_eq!(event.payload["draft_id"], draft_id.to_string());
        assert_eq!(event.payload["stage"], "validating");
    }
}
