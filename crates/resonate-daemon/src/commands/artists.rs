//! Artist registry and roster command handlers.
//!
//! Roster edits operate on the whole draft row: contributors and splits
//! change together or not at all.

use std::sync::Arc;

use serde_json::Value;

use resonate_ledger::SplitError;
use resonate_provision::ProvisioningClient;
use resonate_types::Contributor;

use super::{draft_db_err, draft_id_param, str_param, unix_now, Result};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Mint a ghost identity plus custodial wallet for an artist with no key
/// of their own. The claim secret appears in this response and nowhere
/// else.
pub async fn provision_artist(state: &Arc<DaemonState>, params: &Value) -> Result {
    let name = str_param(params, "name")?;
    let role = params
        .get("role")
        .and_then(|v| v.as_str())
        .unwrap_or("Artist");

    if state.config.custody.admin_key.is_empty() {
        return Err(RpcError::provision_failed("custody admin key not configured"));
    }

    let client = ProvisioningClient::new(
        state.config.custody.provider_url.clone(),
        state.config.custody.admin_key.clone(),
    );
    let identity = client
        .create_identity(name)
        .await
        .map_err(|e| RpcError::provision_failed(&e.to_string()))?;

    let mut contributor = Contributor::new(identity.pubkey.clone(), name, role);
    contributor.is_ghost = true;
    contributor.wallet = Some(identity.wallet.clone());

    let db = state.db.lock().await;
    resonate_db::queries::artists::upsert(&db, &contributor, unix_now())
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "ArtistProvisioned".to_string(),
        timestamp: unix_now(),
        payload: serde_json::json!({"pubkey": identity.pubkey}),
    });

    Ok(serde_json::json!({
        "pubkey": identity.pubkey,
        "claim_secret": identity.secret,
        "wallet": identity.wallet,
    }))
}

/// List every artist in the registry.
pub async fn list_artists(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let artists = resonate_db::queries::artists::list(&db)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    serde_json::to_value(&artists).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Remove an artist from the registry. Drafts referencing them keep their
/// own roster copy.
pub async fn remove_artist(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pubkey = str_param(params, "pubkey")?;
    let db = state.db.lock().await;
    resonate_db::queries::artists::remove(&db, pubkey).map_err(|e| match e {
        resonate_db::DbError::NotFound(_) => RpcError::artist_not_found(pubkey),
        other => RpcError::internal_error(&format!("db error: {other}")),
    })?;
    Ok(serde_json::json!({"removed": true}))
}

/// Add or update a contributor on a draft. Splits are reconciled so every
/// roster member has an entry; existing weights are never disturbed.
pub async fn add_contributor(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let contributor_value = params
        .get("contributor")
        .ok_or_else(|| RpcError::invalid_params("contributor required"))?;
    let contributor: Contributor = serde_json::from_value(contributor_value.clone())
        .map_err(|e| RpcError::invalid_params(&format!("malformed contributor: {e}")))?;
    if contributor.pubkey.is_empty() {
        return Err(RpcError::invalid_params("contributor pubkey required"));
    }

    let db = state.db.lock().await;
    let mut draft =
        resonate_db::queries::drafts::get(&db, &id).map_err(|e| draft_db_err(&id, e))?;
    draft.upsert_contributor(contributor, unix_now());
    draft.splits = resonate_ledger::reconcile_missing(&draft.splits, &draft.contributors);
    resonate_db::queries::drafts::put(&db, &draft)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    drop(db);

    roster_response(&draft)
}

/// Remove a contributor and their split entry in one step. Remaining
/// weights are left exactly as they were.
pub async fn remove_contributor(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let pubkey = str_param(params, "pubkey")?;

    let db = state.db.lock().await;
    let mut draft =
        resonate_db::queries::drafts::get(&db, &id).map_err(|e| draft_db_err(&id, e))?;
    draft.remove_contributor(pubkey, unix_now());
    resonate_db::queries::drafts::put(&db, &draft)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    drop(db);

    roster_response(&draft)
}

/// Set one recipient's weight. The whole ledger is replaced in the draft
/// row; a rejected weight leaves it untouched.
pub async fn set_split_weight(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let pubkey = str_param(params, "pubkey")?;
    let weight = params
        .get("weight")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("weight required"))?;

    let db = state.db.lock().await;
    let mut draft =
        resonate_db::queries::drafts::get(&db, &id).map_err(|e| draft_db_err(&id, e))?;
    draft.splits = resonate_ledger::set_weight(&draft.splits, pubkey, weight).map_err(
        |e| match e {
            SplitError::InvalidWeight { weight } => RpcError::invalid_weight(weight),
        },
    )?;
    draft.touch(unix_now());
    resonate_db::queries::drafts::put(&db, &draft)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    drop(db);

    roster_response(&draft)
}

fn roster_response(draft: &resonate_types::ReleaseDraft) -> Result {
    Ok(serde_json::json!({
        "draft_id": draft.id.to_string(),
        "contributors": draft.contributors,
        "splits": draft.splits,
        "total_bps": resonate_ledger::total_bps(&draft.splits),
        "is_complete": resonate_ledger::is_complete(&draft.splits),
    }))
}
