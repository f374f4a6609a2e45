//! resonate-daemon: the Resonate release daemon.
//!
//! Single OS process running a Tokio async runtime. Frontends communicate
//! with the daemon via line-delimited JSON-RPC over a Unix socket.

mod commands;
mod config;
mod events;
mod rpc;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use resonate_publish::Publisher;
use resonate_relay::MemoryRelayNetwork;

use crate::commands::publish::PublishRun;
use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Workflow runner; owns the per-draft in-flight guard.
    pub publisher: Arc<Publisher>,
    /// Relay backend. In-memory in this build; the trait seam is where a
    /// wire transport plugs in.
    pub relay_network: MemoryRelayNetwork,
    /// Latest publish run per draft.
    pub publish_runs: RwLock<HashMap<Uuid, Arc<PublishRun>>>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("resonate=info".parse()?),
        )
        .init();

    info!("Resonate daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("resonate.db");
    let conn = resonate_db::open(&db_path)?;
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 3. Event bus and shutdown channel
    let event_bus = EventBus::new(1000);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 4. Build daemon state
    let state = Arc::new(DaemonState {
        db,
        config,
        event_bus,
        publisher: Arc::new(Publisher::new()),
        relay_network: MemoryRelayNetwork::new(),
        publish_runs: RwLock::new(HashMap::new()),
        shutdown_tx: shutdown_tx.clone(),
    });

    // 5. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(events::Event {
        event_type: "DaemonStarted".to_string(),
        timestamp: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        payload: serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    });

    // 6. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");
    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");
    Ok(())
}
