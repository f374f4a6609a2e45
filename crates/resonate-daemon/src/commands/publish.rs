//! Publish workflow command handlers.
//!
//! `publish_draft` starts a background run and returns immediately; progress
//! streams over the event bus and the full history stays queryable through
//! `publish_status` until the next run for that draft replaces it.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use uuid::Uuid;

use resonate_publish::{DraftStore, EventLog, PublishContext, Publisher};
use resonate_signer::{
    LocalSigner, RemoteSigner, SignError, SignRequest, Signer, SignerKind,
    DEFAULT_APPROVAL_TIMEOUT,
};
use resonate_types::DraftStatus;

use super::{draft_db_err, draft_id_param, str_param, unix_now, Result};
use crate::events::{Event, ProgressBridge};
use crate::rpc::RpcError;
use crate::DaemonState;

/// State the daemon keeps per publish run.
pub struct PublishRun {
    /// Full progress history for this run.
    pub log: Arc<EventLog>,
    /// Fires cancellation into the workflow's suspension points.
    pub cancel_tx: broadcast::Sender<()>,
    /// Remote-signing request awaiting an approval decision, if any.
    pub pending: Arc<AsyncMutex<Option<SignRequest>>>,
}

struct SqliteDraftStore {
    db: Arc<AsyncMutex<rusqlite::Connection>>,
}

#[async_trait::async_trait]
impl DraftStore for SqliteDraftStore {
    async fn mark_published(&self, draft_id: Uuid, updated_at: u64) -> anyhow::Result<()> {
        let db = self.db.lock().await;
        resonate_db::queries::drafts::mark_published(&db, &draft_id, updated_at)?;
        Ok(())
    }
}

/// Start publishing a draft.
pub async fn publish_draft(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let draft = {
        let db = state.db.lock().await;
        resonate_db::queries::drafts::get(&db, &id).map_err(|e| draft_db_err(&id, e))?
    };

    if draft.status == DraftStatus::Published {
        return Err(RpcError::already_published());
    }
    if state.publisher.is_publishing(id) {
        return Err(RpcError::publish_in_flight());
    }
    // Pre-check so the caller hears about a bad ledger synchronously; the
    // workflow revalidates as its first stage regardless.
    let total = resonate_ledger::total_bps(&draft.splits);
    if !resonate_ledger::is_complete(&draft.splits) {
        return Err(RpcError::split_mismatch(total));
    }

    let mut relays = state.config.relay.urls.clone();
    for split in &draft.splits {
        if !relays.contains(&split.relay) {
            relays.push(split.relay.clone());
        }
    }

    let kind = resonate_signer::select_kind(&draft.contributors);
    let pending: Arc<AsyncMutex<Option<SignRequest>>> = Arc::new(AsyncMutex::new(None));
    let (signer, connect_uri): (Box<dyn Signer>, Option<String>) = match kind {
        SignerKind::Local => (Box::new(local_signer(state).await?), None),
        SignerKind::Remote => {
            let uri = format!("resonate+sign://session/{id}");
            let (signer, mut session) = RemoteSigner::new(uri.clone(), DEFAULT_APPROVAL_TIMEOUT);
            let pending = pending.clone();
            // Park incoming requests where approve/reject commands can
            // reach them.
            tokio::spawn(async move {
                while let Some(request) = session.requests.recv().await {
                    *pending.lock().await = Some(request);
                }
            });
            (Box::new(signer), Some(uri))
        }
    };

    let (cancel_tx, cancel_rx) = broadcast::channel(1);
    let log = Arc::new(EventLog::new());
    let run = Arc::new(PublishRun {
        log: log.clone(),
        cancel_tx,
        pending,
    });
    {
        // Reserve the run slot under the write lock. Two racing publish
        // calls for the same draft must not both pass the in-flight check:
        // replacing a live run's entry would drop its cancel sender and
        // orphan its progress log.
        let mut runs = state.publish_runs.write().await;
        let live = state.publisher.is_publishing(id)
            || runs.get(&id).is_some_and(|r| run_is_live(r));
        if live {
            return Err(RpcError::publish_in_flight());
        }
        runs.insert(id, run);
    }

    let ctx = PublishContext::new(relays, state.config.platform_recipient(), kind);
    let publisher = state.publisher.clone();
    let connector = state.relay_network.clone();
    let store = SqliteDraftStore {
        db: state.db.clone(),
    };
    let bridge = ProgressBridge::new(id, log, state.event_bus.clone());
    let bus = state.event_bus.clone();

    tokio::spawn(async move {
        let result = publisher
            .run(&draft, &connector, signer.as_ref(), &store, &bridge, cancel_rx, &ctx)
            .await;
        let event = match result {
            Ok(outcome) => Event {
                event_type: "PublishCompleted".to_string(),
                timestamp: unix_now(),
                payload: serde_json::json!({
                    "draft_id": id.to_string(),
                    "acks": outcome.acks,
                }),
            },
            Err(err) => Event {
                event_type: "PublishFailed".to_string(),
                timestamp: unix_now(),
                payload: serde_json::json!({
                    "draft_id": id.to_string(),
                    "error": err.to_string(),
                }),
            },
        };
        bus.emit(event);
    });

    Ok(serde_json::json!({
        "started": true,
        "draft_id": id.to_string(),
        "signer": match kind {
            SignerKind::Local => "local",
            SignerKind::Remote => "remote",
        },
        "connect_uri": connect_uri,
    }))
}

/// Current stage and full progress history for a draft's latest run.
pub async fn publish_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let runs = state.publish_runs.read().await;
    match runs.get(&id) {
        Some(run) => Ok(serde_json::json!({
            "stage": run.log.current_stage().as_str(),
            "events": run.log.events(),
        })),
        None => Ok(serde_json::json!({
            "stage": "idle",
            "events": [],
        })),
    }
}

/// Cancel an in-flight publish run.
pub async fn cancel_publish(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let runs = state.publish_runs.read().await;
    let run = runs
        .get(&id)
        .ok_or_else(|| RpcError::invalid_params("no publish run for draft"))?;
    // No receiver means the run already finished; idempotent either way.
    let _ = run.cancel_tx.send(());
    Ok(serde_json::json!({"cancelled": true}))
}

/// Approve a pending remote-signing request with a device-held secret.
pub async fn approve_signature(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let secret = str_param(params, "secret")?;

    let request = take_pending(state, &id).await?;
    let device_key = LocalSigner::from_hex(secret)
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    let signed = device_key
        .sign(request.record)
        .await
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    // Workflow may have timed out or been cancelled in the meantime.
    let _ = request.respond.send(Ok(signed));
    Ok(serde_json::json!({"approved": true}))
}

/// Reject a pending remote-signing request.
pub async fn reject_signature(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let reason = params
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("declined on device");

    let request = take_pending(state, &id).await?;
    let _ = request
        .respond
        .send(Err(SignError::Rejected(reason.to_string())));
    Ok(serde_json::json!({"rejected": true}))
}

/// A run whose log has not reached a terminal stage is still in flight;
/// a freshly reserved slot (empty log, stage idle) counts as live too.
fn run_is_live(run: &PublishRun) -> bool {
    !run.log.current_stage().is_terminal()
}

async fn take_pending(
    state: &Arc<DaemonState>,
    id: &Uuid,
) -> std::result::Result<SignRequest, RpcError> {
    let runs = state.publish_runs.read().await;
    let run = runs
        .get(id)
        .ok_or_else(|| RpcError::invalid_params("no publish run for draft"))?;
    let request = run.pending.lock().await.take();
    request.ok_or_else(|| RpcError::invalid_params("no pending signature for draft"))
}

async fn local_signer(state: &Arc<DaemonState>) -> std::result::Result<LocalSigner, RpcError> {
    let db = state.db.lock().await;
    match resonate_db::queries::settings::get(&db, "local_signing_key") {
        Ok(secret) => LocalSigner::from_hex(&secret)
            .map_err(|e| RpcError::internal_error(&format!("stored signing key: {e}"))),
        Err(resonate_db::DbError::NotFound(_)) => {
            let signer = LocalSigner::generate();
            let secret = hex::encode(signer.secret_bytes());
            resonate_db::queries::settings::set(&db, "local_signing_key", &secret)
                .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
            Ok(signer)
        }
        Err(e) => Err(RpcError::internal_error(&format!("db error: {e}"))),
    }
}
