//! # Resource Handshake Demo
//!
//! Runs two in-process nodes over loopback channels and a shared resource
//! store. `node-a` asks `node-b` for a task; the request is held back until
//! both sides have proven control of their resource channel, then
//! delivered.
//!
//! ```text
//! resource-handshake-demo [config.toml]
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use resource_handshake::{
    init_tracing, HandshakeConfig, HandshakeController, HandshakeRegistry, HandshakeSession,
    InMemoryResourceStore, LoopbackChannel, PeerId, SessionInput, StaticTransferPolicy,
    TaskRequest,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info")?;

    let config = match std::env::args().nth(1) {
        Some(path) => HandshakeConfig::load(Path::new(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => HandshakeConfig::default(),
    };
    info!(
        timeout_secs = config.timeout_secs,
        label = %config.nonce_label,
        "Starting resource handshake demo"
    );

    let workdir = std::env::temp_dir().join(format!("resource-handshake-demo-{}", Uuid::new_v4()));
    let store_a = Arc::new(InMemoryResourceStore::new(workdir.join("node-a")));
    let store_b = Arc::new(InMemoryResourceStore::with_content(
        workdir.join("node-b"),
        store_a.content(),
    ));

    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let (deliveries_tx, mut deliveries_rx) = mpsc::unbounded_channel();

    let (controller_a, events_a) = HandshakeController::new(
        PeerId::new("node-b"),
        config.clone(),
        Arc::new(HandshakeRegistry::new()),
        store_a,
        Arc::new(LoopbackChannel::connected(b_tx.clone())),
        Arc::new(StaticTransferPolicy::new()),
    );
    let (controller_b, events_b) = HandshakeController::new(
        PeerId::new("node-a"),
        config.clone(),
        Arc::new(HandshakeRegistry::new()),
        store_b,
        Arc::new(LoopbackChannel::connected(a_tx.clone())),
        Arc::new(StaticTransferPolicy::new()),
    );

    let node_a = tokio::spawn(HandshakeSession::new(controller_a, events_a).run(a_rx));
    let node_b = tokio::spawn(
        HandshakeSession::new(controller_b, events_b)
            .with_deliveries(deliveries_tx)
            .run(b_rx),
    );

    let request = TaskRequest {
        node_name: "node-a".to_string(),
        task_id: format!("task-{}", Uuid::new_v4()),
        perf_index: 1000.0,
        price: 10,
        max_resource_size: 1 << 30,
        max_memory_size: 1 << 30,
        num_cores: 2,
    };
    a_tx.send(SessionInput::RequestTask(request))
        .map_err(|_| anyhow!("node-a session stopped before the request"))?;

    let delivered = tokio::time::timeout(config.timeout(), deliveries_rx.recv()).await;
    match delivered {
        Ok(Some((from, request))) => {
            info!(from = %from, task_id = %request.task_id, "node-b received task request")
        }
        Ok(None) => warn!("node-b session ended without a task request"),
        Err(_) => warn!("no task request within the handshake timeout"),
    }

    // Closing A disconnects B
    a_tx.send(SessionInput::Close).ok();
    let report_a = node_a.await.context("node-a session panicked")?;
    let report_b = node_b.await.context("node-b session panicked")?;
    info!(stage = ?report_a.stage, blocked = report_a.blocked, "node-a finished");
    info!(stage = ?report_b.stage, blocked = report_b.blocked, "node-b finished");

    if let Err(err) = std::fs::remove_dir_all(&workdir) {
        warn!(dir = %workdir.display(), %err, "Could not remove demo directory");
    }
    Ok(())
}
