//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod artists;
pub mod drafts;
pub mod publish;

use serde_json::Value;
use uuid::Uuid;

use resonate_db::DbError;

use crate::rpc::RpcError;

/// Command handlers return a JSON value or an RPC error.
pub type Result = std::result::Result<Value, RpcError>;

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Pull a required `draft_id` uuid out of params.
pub(crate) fn draft_id_param(params: &Value) -> std::result::Result<Uuid, RpcError> {
    let raw = params
        .get("draft_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("draft_id required"))?;
    Uuid::parse_str(raw).map_err(|_| RpcError::invalid_params("draft_id is not a uuid"))
}

/// Pull a required string out of params.
pub(crate) fn str_param<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Map a database error onto the RPC error table for draft lookups.
pub(crate) fn draft_db_err(id: &Uuid, e: DbError) -> RpcError {
    match e {
        DbError::NotFound(_) => RpcError::draft_not_found(&id.to_string()),
        other => RpcError::internal_error(&format!("db error: {other}")),
    }
}
