//! Delegated device signer.
//!
//! The record is handed to an external approver (the artist's own device)
//! which signs with a key this process never sees. The wait is long-running
//! and human-paced, so it is bounded by a timeout and cancellable at any
//! point. The wire protocol to the device is outside this crate; the
//! [`RemoteSessionHandle`] is the seam where that transport plugs in.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use resonate_record::{ReleaseRecord, SignedRecord};

use crate::{Result, SignError, Signer};

/// Default window for the human approval round trip.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(60);

/// A signing request in flight to the approver device.
#[derive(Debug)]
pub struct SignRequest {
    /// The record awaiting approval.
    pub record: ReleaseRecord,
    /// Channel the device session answers on. Dropping it without answering
    /// counts as a rejection.
    pub respond: oneshot::Sender<Result<SignedRecord>>,
}

/// Signer that forwards records to an external approver device.
pub struct RemoteSigner {
    connect_uri: String,
    timeout: Duration,
    request_tx: mpsc::Sender<SignRequest>,
    cancel_tx: broadcast::Sender<()>,
}

/// The device-session side of a remote signer: receives [`SignRequest`]s
/// and answers them. In production this is driven by the device transport;
/// in tests a task answers directly.
pub struct RemoteSessionHandle {
    /// Incoming signing requests.
    pub requests: mpsc::Receiver<SignRequest>,
}

impl RemoteSigner {
    /// Create a remote signer and the session handle that will serve it.
    ///
    /// `connect_uri` is the human-presentable URI the approver device uses
    /// to attach to this session.
    pub fn new(connect_uri: impl Into<String>, timeout: Duration) -> (Self, RemoteSessionHandle) {
        let (request_tx, requests) = mpsc::channel(1);
        let (cancel_tx, _) = broadcast::channel(1);
        (
            Self {
                connect_uri: connect_uri.into(),
                timeout,
                request_tx,
                cancel_tx,
            },
            RemoteSessionHandle { requests },
        )
    }

    /// The URI to present to the approver device.
    pub fn connect_uri(&self) -> &str {
        &self.connect_uri
    }

    /// A handle that cancels any in-flight approval wait.
    pub fn cancel_handle(&self) -> RemoteCancelHandle {
        RemoteCancelHandle {
            cancel_tx: self.cancel_tx.clone(),
        }
    }
}

/// Cancels a remote signing wait from outside the workflow.
#[derive(Clone)]
pub struct RemoteCancelHandle {
    cancel_tx: broadcast::Sender<()>,
}

impl RemoteCancelHandle {
    /// Cancel the pending approval wait, if any.
    pub fn cancel(&self) {
        // No receiver means no wait in flight; nothing to do.
        let _ = self.cancel_tx.send(());
    }
}

#[async_trait::async_trait]
impl Signer for RemoteSigner {
    async fn sign(&self, record: ReleaseRecord) -> Result<SignedRecord> {
        let (respond, response_rx) = oneshot::channel();
        let mut cancel_rx = self.cancel_tx.subscribe();

        self.request_tx
            .send(SignRequest { record, respond })
            .await
            .map_err(|_| SignError::Rejected("approver session closed".to_string()))?;

        tracing::info!(
            uri = %self.connect_uri,
            timeout_secs = self.timeout.as_secs(),
            "awaiting external approval"
        );

        tokio::select! {
            response = response_rx => match response {
                Ok(result) => result,
                // Session dropped the responder without answering.
                Err(_) => Err(SignError::Rejected(
                    "approver session ended without a decision".to_string(),
                )),
            },
            _ = cancel_rx.recv() => {
                tracing::warn!("remote signing cancelled while awaiting approval");
                Err(SignError::Cancelled)
            }
            _ = tokio::time::sleep(self.timeout) => {
                Err(SignError::Timeout { secs: self.timeout.as_secs() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalSigner;

    fn record() -> ReleaseRecord {
        ReleaseRecord {
            kind: resonate_types::RELEASE_KIND,
            created_at: 1_700_000_000,
            tags: vec![vec!["d".into(), "some-id".into()]],
            content: "{}".into(),
        }
    }

    #[tokio::test]
    async fn test_approved_request_returns_signed_record() {
        let (signer, mut session) =
            RemoteSigner::new("resonate+sign://session/abc", Duration::from_secs(5));

        // Stand-in for the artist's device: sign whatever arrives.
        tokio::spawn(async move {
            let device_key = LocalSigner::generate();
            if let Some(request) = session.requests.recv().await {
                let signed = device_key.sign(request.record).await;
                let _ = request.respond.send(signed);
            }
        });

        let signed = signer.sign(record()).await.expect("approved");
        crate::verify(&signed).expect("verify");
    }

    #[tokio::test]
    async fn test_rejection_propagates() {
        let (signer, mut session) =
            RemoteSigner::new("resonate+sign://session/abc", Duration::from_secs(5));

        tokio::spawn(async move {
            if let Some(request) = session.requests.recv().await {
                let _ = request
                    .respond
                    .send(Err(SignError::Rejected("declined on device".to_string())));
            }
        });

        let err = signer.sign(record()).await.expect_err("rejected");
        assert!(matches!(err, SignError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_timeout_when_device_never_answers() {
        let (signer, _session) =
            RemoteSigner::new("resonate+sign://session/abc", Duration::from_millis(20));

        let err = signer.sign(record()).await.expect_err("timed out");
        assert!(matches!(err, SignError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_the_wait() {
        let (signer, _session) =
            RemoteSigner::new("resonate+sign://session/abc", Duration::from_secs(30));
        let cancel = signer.cancel_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let err = signer.sign(record()).await.expect_err("cancelled");
        assert!(matches!(err, SignError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_session_counts_as_rejection() {
        let (signer, session) =
            RemoteSigner::new("resonate+sign://session/abc", Duration::from_secs(5));
        drop(session);

        let err = signer.sign(record()).await.expect_err("no session");
        assert!(matches!(err, SignError::Rejected(_)));
    }
}
