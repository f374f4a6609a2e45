//! Draft library command handlers.

use std::sync::Arc;

use serde_json::Value;

use resonate_types::ReleaseDraft;

use super::{draft_db_err, draft_id_param, unix_now, Result};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Create a fresh draft, optionally titled.
pub async fn create_draft(state: &Arc<DaemonState>, params: &Value) -> Result {
    let mut draft = ReleaseDraft::new(unix_now());
    if let Some(title) = params.get("title").and_then(|v| v.as_str()) {
        draft.title = title.to_string();
    }

    let db = state.db.lock().await;
    resonate_db::queries::drafts::put(&db, &draft)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "DraftCreated".to_string(),
        timestamp: unix_now(),
        payload: serde_json::json!({"draft_id": draft.id.to_string()}),
    });

    serde_json::to_value(&draft).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Fetch a full draft by id.
pub async fn get_draft(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let db = state.db.lock().await;
    let draft = resonate_db::queries::drafts::get(&db, &id).map_err(|e| draft_db_err(&id, e))?;
    serde_json::to_value(&draft).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Store a whole draft, replacing the previous row. The ledger travels
/// inside the draft so roster and splits can never be half-saved.
pub async fn save_draft(state: &Arc<DaemonState>, params: &Value) -> Result {
    let draft_value = params
        .get("draft")
        .ok_or_else(|| RpcError::invalid_params("draft required"))?;
    let mut draft: ReleaseDraft = serde_json::from_value(draft_value.clone())
        .map_err(|e| RpcError::invalid_params(&format!("malformed draft: {e}")))?;
    draft.touch(unix_now());

    let db = state.db.lock().await;
    resonate_db::queries::drafts::put(&db, &draft)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "DraftSaved".to_string(),
        timestamp: unix_now(),
        payload: serde_json::json!({"draft_id": draft.id.to_string()}),
    });

    Ok(serde_json::json!({
        "draft_id": draft.id.to_string(),
        "updated_at": draft.updated_at,
    }))
}

/// Delete a draft. Deleting an absent draft is not an error.
pub async fn delete_draft(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = draft_id_param(params)?;
    let db = state.db.lock().await;
    resonate_db::queries::drafts::delete(&db, &id)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    drop(db);

    state.event_bus.emit(Event {
        event_type: "DraftDeleted".to_string(),
        timestamp: unix_now(),
        payload: serde_json::json!({"draft_id": id.to_string()}),
    });

    Ok(serde_json::json!({"deleted": true}))
}

/// List all drafts as library summaries, most recently touched first.
pub async fn list_drafts(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let summaries = resonate_db::queries::drafts::list_all(&db)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    serde_json::to_value(&summaries).map_err(|e| RpcError::internal_error(&e.to_string()))
}
