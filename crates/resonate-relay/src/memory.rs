//! In-process relay network.
//!
//! Serves two purposes: daemon dev mode runs against it so the full publish
//! path works without network infrastructure, and tests script per-relay
//! behavior (accept, reject, unreachable, never-answer) to exercise every
//! workflow failure branch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use resonate_record::SignedRecord;

use crate::{RelayAck, RelayConnection, RelayConnector, RelayError, Result};

/// Scripted behavior for one relay address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RelayBehavior {
    /// Accept broadcasts.
    #[default]
    Accept,
    /// Acknowledge negatively.
    Reject,
    /// Refuse the connection entirely.
    Unreachable,
    /// Accept the connection but never answer a broadcast.
    Hang,
}

#[derive(Default)]
struct Inner {
    behaviors: HashMap<String, RelayBehavior>,
    accepted: Vec<SignedRecord>,
}

/// An in-process relay network. Clones share state, so a test can hold one
/// handle to script behavior and inspect accepted records while the
/// workflow holds another.
#[derive(Clone, Default)]
pub struct MemoryRelayNetwork {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRelayNetwork {
    /// Create a network where every relay accepts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior of a relay address.
    pub fn set_behavior(&self, relay: impl Into<String>, behavior: RelayBehavior) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.behaviors.insert(relay.into(), behavior);
        }
    }

    /// Records accepted by any relay so far.
    pub fn accepted_records(&self) -> Vec<SignedRecord> {
        self.inner
            .lock()
            .map(|inner| inner.accepted.clone())
            .unwrap_or_default()
    }

    fn behavior(&self, relay: &str) -> RelayBehavior {
        self.inner
            .lock()
            .map(|inner| inner.behaviors.get(relay).copied().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RelayConnector for MemoryRelayNetwork {
    async fn connect(&self, relays: &[String]) -> Result<Box<dyn RelayConnection>> {
        let reachable: Vec<String> = relays
            .iter()
            .filter(|r| self.behavior(r) != RelayBehavior::Unreachable)
            .cloned()
            .collect();

        if reachable.is_empty() {
            return Err(RelayError::Unavailable(format!(
                "none of {} relay(s) reachable",
                relays.len()
            )));
        }

        tracing::debug!(
            connected = reachable.len(),
            requested = relays.len(),
            "memory relay connection established"
        );

        Ok(Box::new(MemoryConnection {
            network: self.clone(),
            relays: reachable,
        }))
    }
}

struct MemoryConnection {
    network: MemoryRelayNetwork,
    relays: Vec<String>,
}

#[async_trait::async_trait]
impl RelayConnection for MemoryConnection {
    async fn broadcast(&self, record: &SignedRecord) -> Result<Vec<RelayAck>> {
        if self
            .relays
            .iter()
            .any(|r| self.network.behavior(r) == RelayBehavior::Hang)
        {
            // A hung relay never answers; the caller's timeout fires.
            std::future::pending::<()>().await;
        }

        let mut acks = Vec::with_capacity(self.relays.len());
        for relay in &self.relays {
            match self.network.behavior(relay) {
                RelayBehavior::Accept => {
                    if let Ok(mut inner) = self.network.inner.lock() {
                        inner.accepted.push(record.clone());
                    }
                    acks.push(RelayAck {
                        relay: relay.clone(),
                        accepted: true,
                        message: "stored".to_string(),
                    });
                }
                RelayBehavior::Reject => acks.push(RelayAck {
                    relay: relay.clone(),
                    accepted: false,
                    message: "blocked: policy".to_string(),
                }),
                RelayBehavior::Unreachable | RelayBehavior::Hang => {}
            }
        }

        if acks.iter().all(|a| !a.accepted) {
            let reason = acks
                .first()
                .map(|a| a.message.clone())
                .unwrap_or_else(|| "no relay answered".to_string());
            return Err(RelayError::BroadcastRejected(reason));
        }

        Ok(acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_record::ReleaseRecord;

    fn signed() -> SignedRecord {
        SignedRecord {
            record: ReleaseRecord {
                kind: resonate_types::RELEASE_KIND,
                created_at: 1_700_000_000,
                tags: vec![vec!["d".into(), "some-id".into()]],
                content: "{}".into(),
            },
            pubkey: "aa".repeat(32),
            sig: "bb".repeat(64),
        }
    }

    fn relays(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_broadcast_collects_ack_per_relay() {
        let network = MemoryRelayNetwork::new();
        let conn = network
            .connect(&relays(&["wss://a", "wss://b"]))
            .await
            .expect("connect");
        let acks = conn.broadcast(&signed()).await.expect("broadcast");
        assert_eq!(acks.len(), 2);
        assert!(acks.iter().all(|a| a.accepted));
        assert_eq!(network.accepted_records().len(), 2);
    }

    #[tokio::test]
    async fn test_all_unreachable_fails_connect() {
        let network = MemoryRelayNetwork::new();
        network.set_behavior("wss://a", RelayBehavior::Unreachable);
        let err = network
            .connect(&relays(&["wss://a"]))
            .await
            .err()
            .expect("unavailable");
        assert!(matches!(err, RelayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_relay_list_fails_connect() {
        let network = MemoryRelayNetwork::new();
        assert!(network.connect(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_partial_rejection_is_still_a_success() {
        let network = MemoryRelayNetwork::new();
        network.set_behavior("wss://b", RelayBehavior::Reject);
        let conn = network
            .connect(&relays(&["wss://a", "wss://b"]))
            .await
            .expect("connect");
        let acks = conn.broadcast(&signed()).await.expect("broadcast");
        assert_eq!(acks.iter().filter(|a| a.accepted).count(), 1);
        assert_eq!(acks.iter().filter(|a| !a.accepted).count(), 1);
    }

    #[tokio::test]
    async fn test_unanimous_rejection_fails_broadcast() {
        let network = MemoryRelayNetwork::new();
        network.set_behavior("wss://a", RelayBehavior::Reject);
        let conn = network
            .connect(&relays(&["wss://a"]))
            .await
            .expect("connect");
        let err = conn.broadcast(&signed()).await.err().expect("rejected");
        assert!(matches!(err, RelayError::BroadcastRejected(_)));
        assert!(network.accepted_records().is_empty());
    }

    #[tokio::test]
    async fn test_hung_relay_never_answers() {
        let network = MemoryRelayNetwork::new();
        network.set_behavior("wss://a", RelayBehavior::Hang);
        let conn = network
            .connect(&relays(&["wss://a"]))
            .await
            .expect("connect");
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            conn.broadcast(&signed()),
        )
        .await;
        assert!(result.is_err(), "broadcast should still be pending");
    }
}
