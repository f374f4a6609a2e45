//! # resonate-relay
//!
//! Relay connection provider: the contract the publish workflow uses to
//! reach the relay network, plus an in-process implementation for tests and
//! daemon dev mode.
//!
//! The actual wire transport to real relays lives behind [`RelayConnector`];
//! this crate only fixes the contract: connect to a set of relay addresses,
//! broadcast a signed record, and report one acknowledgement per relay.
//! Partial acceptance is the caller's policy question, not an error here —
//! a broadcast fails only when every relay refuses or none answers in time.
//!
//! ## Modules
//!
//! - [`memory`] — in-process relay network with scriptable failures

pub mod memory;

pub use memory::{MemoryRelayNetwork, RelayBehavior};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use resonate_record::SignedRecord;

/// Bounded window for a broadcast to collect at least one acknowledgement.
pub const BROADCAST_TIMEOUT: Duration = Duration::from_secs(5);

/// Error types for relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No relay connection could be established.
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    /// Every connected relay refused the record.
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// No relay acknowledged within the bounded window.
    #[error("broadcast timed out after {secs}s")]
    BroadcastTimeout {
        /// The window that elapsed.
        secs: u64,
    },
}

/// Convenience result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Acknowledgement from a single relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAck {
    /// Relay address the acknowledgement came from.
    pub relay: String,
    /// Whether the relay accepted the record.
    pub accepted: bool,
    /// Relay-provided detail (rejection reason, dedup notice, ...).
    pub message: String,
}

/// Provider of relay connections.
#[async_trait::async_trait]
pub trait RelayConnector: Send + Sync {
    /// Acquire a connection handle covering the given relay addresses.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Unavailable`] if no relay can be reached
    async fn connect(&self, relays: &[String]) -> Result<Box<dyn RelayConnection>>;
}

/// An established connection to one or more relays.
#[async_trait::async_trait]
pub trait RelayConnection: Send + Sync {
    /// Submit a signed record to every connected relay and collect one
    /// acknowledgement per relay.
    ///
    /// # Errors
    ///
    /// - [`RelayError::BroadcastRejected`] if every relay refuses
    async fn broadcast(&self, record: &SignedRecord) -> Result<Vec<RelayAck>>;
}
