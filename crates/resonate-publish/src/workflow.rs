//! The publish state machine.
//!
//! Stages run strictly in order: Validating, Connecting, Building, Signing,
//! Broadcasting, Persisting, Done. Any failure halts at the failing stage
//! and the run ends in `Errored`; the draft stays untouched on disk unless
//! Persisting completed.
//!
//! Cancellation is checked at every suspension point (connect, sign,
//! broadcast). A cancel that lands mid-signature leaves the draft exactly
//! as it was; the signer is responsible for tearing down its own session.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use uuid::Uuid;

use resonate_record::{RecordError, SignedRecord};
use resonate_relay::{RelayAck, RelayConnector, BROADCAST_TIMEOUT};
use resonate_signer::{Signer, SignerKind};
use resonate_types::{PlatformRecipient, ReleaseDraft};

use crate::observer::{ProgressObserver, Severity};
use crate::{PublishError, PublishStage, Result};

/// Persistence seam for the final stage. The workflow never writes the
/// database directly; the host hands it this capability.
#[async_trait::async_trait]
pub trait DraftStore: Send + Sync {
    /// Flip the draft's status to published and stamp `updated_at`.
    async fn mark_published(&self, draft_id: Uuid, updated_at: u64) -> anyhow::Result<()>;
}

/// Per-run parameters that are not capabilities.
pub struct PublishContext {
    /// Relay addresses to broadcast to.
    pub relays: Vec<String>,
    /// Platform fee recipient stamped into the record.
    pub platform: PlatformRecipient,
    /// Which signer the host selected; only affects progress messaging.
    pub signer_kind: SignerKind,
    /// Upper bound on the whole broadcast round.
    pub broadcast_timeout: Duration,
}

impl PublishContext {
    pub fn new(relays: Vec<String>, platform: PlatformRecipient, signer_kind: SignerKind) -> Self {
        Self {
            relays,
            platform,
            signer_kind,
            broadcast_timeout: BROADCAST_TIMEOUT,
        }
    }
}

/// What a successful run produced.
#[derive(Debug)]
pub struct PublishOutcome {
    /// The signed record as broadcast.
    pub signed: SignedRecord,
    /// One acknowledgement per relay that answered.
    pub acks: Vec<RelayAck>,
}

/// Runs publish workflows and enforces the one-run-per-draft guard.
///
/// A single `Publisher` is shared by the host; concurrent runs for
/// different drafts proceed independently.
#[derive(Default)]
pub struct Publisher {
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Releases the in-flight slot on every exit path.
struct InFlightGuard<'a> {
    publisher: &'a Publisher,
    draft_id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.publisher.in_flight.lock() {
            set.remove(&self.draft_id);
        }
    }
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is currently in flight for `draft_id`.
    pub fn is_publishing(&self, draft_id: Uuid) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(&draft_id))
            .unwrap_or(false)
    }

    /// Run the full publish sequence for `draft`.
    ///
    /// # Errors
    ///
    /// - [`PublishError::AlreadyInFlight`] if this draft is mid-publish
    /// - [`PublishError::SplitMismatch`] before any relay is contacted
    /// - [`PublishError::Cancelled`] if `cancel` fires at a suspension point
    /// - the stage-specific error for any other failure
    pub async fn run(
        &self,
        draft: &ReleaseDraft,
        connector: &dyn RelayConnector,
        signer: &dyn Signer,
        store: &dyn DraftStore,
        observer: &dyn ProgressObserver,
        mut cancel: broadcast::Receiver<()>,
        ctx: &PublishContext,
    ) -> Result<PublishOutcome> {
        let _guard = self.acquire(draft.id)?;
        let result = run_stages(draft, connector, signer, store, observer, &mut cancel, ctx).await;
        if let Err(ref err) = result {
            tracing::warn!(draft = %draft.id, %err, "publish run failed");
        }
        result
    }

    fn acquire(&self, draft_id: Uuid) -> Result<InFlightGuard<'_>> {
        let mut set = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !set.insert(draft_id) {
            return Err(PublishError::AlreadyInFlight);
        }
        drop(set);
        Ok(InFlightGuard {
            publisher: self,
            draft_id,
        })
    }
}

/// Resolves only on an explicit cancel signal. A closed channel is not a
/// cancellation: the host may drop its sender handle while the run is still
/// wanted, so `Closed` parks the future instead of firing the select arm.
async fn cancelled(cancel: &mut broadcast::Receiver<()>) {
    loop {
        match cancel.recv().await {
            Ok(()) => return,
            // A signal was sent even if this receiver missed it.
            Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

async fn run_stages(
    draft: &ReleaseDraft,
    connector: &dyn RelayConnector,
    signer: &dyn Signer,
    store: &dyn DraftStore,
    observer: &dyn ProgressObserver,
    cancel: &mut broadcast::Receiver<()>,
    ctx: &PublishContext,
) -> Result<PublishOutcome> {
    // Validating. Local check only; fails before any collaborator is dialed.
    observer.notify(
        PublishStage::Validating,
        "Validating split distribution",
        Severity::Info,
    );
    let total = resonate_ledger::total_bps(&draft.splits);
    if !resonate_ledger::is_complete(&draft.splits) {
        return Err(errored(
            observer,
            PublishStage::Validating,
            PublishError::SplitMismatch { total },
        ));
    }
    observer.notify(
        PublishStage::Validating,
        &format!("Split distribution complete at {total} bps"),
        Severity::Success,
    );

    // Connecting.
    observer.notify(
        PublishStage::Connecting,
        "Connecting to relay network",
        Severity::Info,
    );
    let connection = tokio::select! {
        _ = cancelled(cancel) => {
            return Err(errored(observer, PublishStage::Connecting, PublishError::Cancelled));
        }
        result = connector.connect(&ctx.relays) => match result {
            Ok(conn) => conn,
            Err(e) => return Err(errored(observer, PublishStage::Connecting, e.into())),
        },
    };

    // Building. Deterministic; created_at is stamped here, once.
    observer.notify(
        PublishStage::Building,
        "Constructing release record",
        Severity::Info,
    );
    let created_at = unix_now();
    let record = match resonate_record::build(draft, &ctx.platform, created_at) {
        Ok(record) => record,
        Err(e) => {
            let err = match e {
                RecordError::IncompleteLedger { total } => PublishError::IncompleteLedger { total },
                RecordError::Serialization(e) => PublishError::Storage(e.to_string()),
            };
            return Err(errored(observer, PublishStage::Building, err));
        }
    };

    // Signing.
    let signing_message = match ctx.signer_kind {
        SignerKind::Local => "Signing release record",
        SignerKind::Remote => "Awaiting approval from artist device",
    };
    observer.notify(PublishStage::Signing, signing_message, Severity::Info);
    let signed = tokio::select! {
        _ = cancelled(cancel) => {
            return Err(errored(observer, PublishStage::Signing, PublishError::Cancelled));
        }
        result = signer.sign(record) => match result {
            Ok(signed) => signed,
            Err(e) => return Err(errored(observer, PublishStage::Signing, e.into())),
        },
    };

    // Broadcasting. One bounded round; a single acceptance is enough.
    observer.notify(
        PublishStage::Broadcasting,
        "Broadcasting release record",
        Severity::Info,
    );
    let acks = tokio::select! {
        _ = cancelled(cancel) => {
            return Err(errored(observer, PublishStage::Broadcasting, PublishError::Cancelled));
        }
        result = tokio::time::timeout(ctx.broadcast_timeout, connection.broadcast(&signed)) => {
            match result {
                Ok(Ok(acks)) => acks,
                Ok(Err(e)) => {
                    return Err(errored(observer, PublishStage::Broadcasting, e.into()));
                }
                Err(_) => {
                    let err = PublishError::BroadcastTimeout {
                        secs: ctx.broadcast_timeout.as_secs(),
                    };
                    return Err(errored(observer, PublishStage::Broadcasting, err));
                }
            }
        }
    };
    let accepted = acks.iter().filter(|a| a.accepted).count();
    let severity = if accepted == acks.len() {
        Severity::Success
    } else {
        Severity::Warn
    };
    observer.notify(
        PublishStage::Broadcasting,
        &format!("Broadcast acknowledged by {accepted} of {} relay(s)", acks.len()),
        severity,
    );

    // Persisting. Runs even if some relays refused; one ack is canonical.
    observer.notify(
        PublishStage::Persisting,
        "Marking release as published",
        Severity::Info,
    );
    if let Err(e) = store.mark_published(draft.id, unix_now()).await {
        return Err(errored(
            observer,
            PublishStage::Persisting,
            PublishError::Storage(e.to_string()),
        ));
    }

    observer.notify(PublishStage::Done, "Release published", Severity::Success);
    tracing::info!(draft = %draft.id, accepted, "release published");

    Ok(PublishOutcome { signed, acks })
}

fn errored(
    observer: &dyn ProgressObserver,
    stage: PublishStage,
    err: PublishError,
) -> PublishError {
    observer.notify(
        PublishStage::Errored,
        &format!("{stage} failed: {err}"),
        Severity::Error,
    );
    err
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
