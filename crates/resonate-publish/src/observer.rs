//! Progress reporting for publish runs.
//!
//! The workflow emits one event per meaningful step. Observers must be
//! cheap and non-blocking; the workflow calls them inline and never waits
//! on delivery.

use std::sync::Mutex;

use crate::PublishStage;

/// How an event should be surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// A single progress event from a publish run.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProgressEvent {
    pub stage: PublishStage,
    pub message: String,
    pub severity: Severity,
}

/// Sink for publish progress. Implementations must not block.
pub trait ProgressObserver: Send + Sync {
    fn notify(&self, stage: PublishStage, message: &str, severity: Severity);
}

/// Observer that discards everything.
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn notify(&self, _stage: PublishStage, _message: &str, _severity: Severity) {}
}

/// In-memory event log. Keeps the full sequence of events for a run so a
/// failure can be shown with everything that led up to it.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far, in emission order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The most recent stage seen, or `Idle` if nothing was recorded.
    pub fn current_stage(&self) -> PublishStage {
        self.events()
            .last()
            .map(|e| e.stage)
            .unwrap_or(PublishStage::Idle)
    }
}

impl ProgressObserver for EventLog {
    fn notify(&self, stage: PublishStage, message: &str, severity: Severity) {
        let event = ProgressEvent {
            stage,
            message: message.to_string(),
            severity,
        };
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
