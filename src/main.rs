//! swarmdb - swarm node status probe
//!
//! Connects to a swarm node, asks for its status once and logs the answer.

use bytes::Bytes;
use std::time::Duration;
use swarmdb_client::{ConnectionConfig, ReadyState, Transport};
use swarmdb_protocol::{Envelope, StatusRequest, StatusResponse};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// How long to wait for the node to answer a status request.
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if SWARMDB_CONFIG is set, then env overrides)
    let config = match ConnectionConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Probing swarm node");
    tracing::info!("  Endpoint: {}", config.endpoint);
    tracing::info!("  Connect timeout: {:?}", config.connect_timeout());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let transport = Transport::connect(
        &config,
        move |bytes| {
            let _ = tx.send(bytes);
        },
        None,
    )?;

    let state = transport.wait_ready().await;
    if state != ReadyState::Open {
        tracing::error!("Could not connect to {} (state {})", config.endpoint, state);
        return Err(format!("connection to {} failed", config.endpoint).into());
    }

    transport.send(swarmdb_protocol::encode(&Envelope::new(StatusRequest {})))?;

    let outcome =
        tokio::time::timeout(STATUS_TIMEOUT, wait_for_status(&transport, &mut rx)).await;

    transport.close();
    transport.closed().await;

    match outcome {
        Ok(Some(status)) => {
            tracing::info!("Node status:");
            tracing::info!("  Version: {}", status.swarm_version);
            tracing::info!("  Commit: {}", status.swarm_git_commit);
            tracing::info!("  Uptime: {}", status.uptime);
            tracing::info!("  PBFT: {}", if status.pbft_enabled { "enabled" } else { "disabled" });
            if !status.module_status_json.is_empty() {
                tracing::info!("  Modules: {}", status.module_status_json);
            }
            Ok(())
        }
        Ok(None) => {
            tracing::error!("Connection closed before the node answered");
            Err("no status response".into())
        }
        Err(_) => {
            tracing::error!("No status response within {:?}", STATUS_TIMEOUT);
            Err("status request timed out".into())
        }
    }
}

/// Returns the first status response, or `None` if the socket closes first.
async fn wait_for_status(
    transport: &Transport,
    rx: &mut mpsc::UnboundedReceiver<Bytes>,
) -> Option<StatusResponse> {
    loop {
        tokio::select! {
            Some(bytes) = rx.recv() => match swarmdb_protocol::decode(&bytes) {
                Ok(envelope) => {
                    if let Some(status) = envelope.as_status_response() {
                        return Some(status.clone());
                    }
                    tracing::debug!("Ignoring {} while waiting for status", envelope.kind());
                }
                Err(e) => tracing::warn!("Ignoring malformed message: {}", e),
            },
            _ = transport.closed() => return None,
        }
    }
}
