//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! line-delimited JSON-RPC 2.0 method calls to the command handlers.
//! Subscribed connections additionally receive daemon events as JSON-RPC
//! notifications on the same stream.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::EventFilter;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Domain errors

    /// Draft not found (-32020).
    pub fn draft_not_found(id: &str) -> Self {
        Self {
            code: -32020,
            message: "DRAFT_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"draft_id": id})),
        }
    }

    /// Artist not found (-32021).
    pub fn artist_not_found(pubkey: &str) -> Self {
        Self {
            code: -32021,
            message: "ARTIST_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"pubkey": pubkey})),
        }
    }

    /// Split total is not exactly 10000 bps (-32030).
    pub fn split_mismatch(total: u64) -> Self {
        Self {
            code: -32030,
            message: "SPLIT_MISMATCH".to_string(),
            data: Some(serde_json::json!({"total_bps": total})),
        }
    }

    /// Negative split weight (-32031).
    pub fn invalid_weight(weight: i64) -> Self {
        Self {
            code: -32031,
            message: "INVALID_WEIGHT".to_string(),
            data: Some(serde_json::json!({"weight": weight})),
        }
    }

    /// A publish run is already in flight for this draft (-32040).
    pub fn publish_in_flight() -> Self {
        Self {
            code: -32040,
            message: "PUBLISH_IN_FLIGHT".to_string(),
            data: None,
        }
    }

    /// Draft is already published (-32041).
    pub fn already_published() -> Self {
        Self {
            code: -32041,
            message: "ALREADY_PUBLISHED".to_string(),
            data: None,
        }
    }

    /// Identity provisioning failed (-32050).
    pub fn provision_failed(detail: &str) -> Self {
        Self {
            code: -32050,
            message: "PROVISION_FAILED".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
///
/// All outbound traffic (responses and event notifications) funnels through
/// one writer task so lines never interleave.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(mut line) = out_rx.recv().await {
            line.push('\n');
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) if request.method == "subscribe_events" => {
                let filter: EventFilter =
                    serde_json::from_value(request.params.clone()).unwrap_or_default();
                spawn_event_forwarder(&state, filter, out_tx.clone());
                RpcResponse::success(request.id, serde_json::json!({"subscribed": true}))
            }
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        if out_tx.send(serde_json::to_string(&response)?).await.is_err() {
            break;
        }
    }

    drop(out_tx);
    writer_task.abort();
    Ok(())
}

/// Forward matching bus events to this connection as notifications.
fn spawn_event_forwarder(state: &Arc<DaemonState>, filter: EventFilter, out_tx: mpsc::Sender<String>) {
    let mut events = state.event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if !filter.matches(&event) {
                continue;
            }
            let notification = serde_json::json!({
                "jsonrpc": "2.0",
                "method": "event",
                "params": event,
            });
            if out_tx.send(notification.to_string()).await.is_err() {
                break; // connection gone
            }
        }
    });
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Dispatching RPC method: {}", method);

    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    let result = match method {
        // Draft library commands
        "create_draft" => commands::drafts::create_draft(&state, &request.params).await,
        "get_draft" => commands::drafts::get_draft(&state, &request.params).await,
        "save_draft" => commands::drafts::save_draft(&state, &request.params).await,
        "delete_draft" => commands::drafts::delete_draft(&state, &request.params).await,
        "list_drafts" => commands::drafts::list_drafts(&state).await,

        // Artist registry and roster commands
        "provision_artist" => commands::artists::provision_artist(&state, &request.params).await,
        "list_artists" => commands::artists::list_artists(&state).await,
        "remove_artist" => commands::artists::remove_artist(&state, &request.params).await,
        "add_contributor" => commands::artists::add_contributor(&state, &request.params).await,
        "remove_contributor" => {
            commands::artists::remove_contributor(&state, &request.params).await
        }
        "set_split_weight" => commands::artists::set_split_weight(&state, &request.params).await,

        // Publish workflow commands
        "publish_draft" => commands::publish::publish_draft(&state, &request.params).await,
        "publish_status" => commands::publish::publish_status(&state, &request.params).await,
        "cancel_publish" => commands::publish::cancel_publish(&state, &request.params).await,
        "approve_signature" => {
            commands::publish::approve_signature(&state, &request.params).await
        }
        "reject_signature" => commands::publish::reject_signature(&state, &request.params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_codes() {
        let err = RpcError::split_mismatch(9790);
        assert_eq!(err.code, -32030);
        assert_eq!(err.message, "SPLIT_MISMATCH");

        let err = RpcError::publish_in_flight();
        assert_eq!(err.code, -32040);

        let err = RpcError::method_not_found("unknown");
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(
            serde_json::json!(1),
            serde_json::json!({"total_bps": 10000}),
        );
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_rpc_response_error() {
        let resp = RpcResponse::error(serde_json::json!(1), RpcError::internal_error("test"));
        assert!(resp.result.is_none());
        assert!(resp.error.is_some());
    }

    #[test]
    fn test_request_parses_without_params() {
        let request: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"list_drafts"}"#)
                .expect("parse");
        assert_eq!(request.method, "list_drafts");
        assert!(request.params.is_null());
    }
}
