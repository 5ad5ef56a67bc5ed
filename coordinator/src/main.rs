//! PoolClear Coordinator Binary
//!
//! Runs a coordinator node with logging collaborators; deployments replace
//! them with channel adapters wired to the real intake and custodian.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poolclear_coordinator::{Coordinator, CoordinatorConfig, LoggingCustodian, LoggingIntake};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting PoolClear Coordinator");

    // Load configuration
    let config = CoordinatorConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    // Generate node ID if not provided
    let node_id = config
        .node_id
        .clone()
        .unwrap_or_else(|| format!("coordinator-{}", uuid::Uuid::new_v4()));

    info!(node_id = %node_id, "Node ID assigned");

    let coordinator = Arc::new(Coordinator::new(
        config.clone(),
        node_id.clone(),
        Arc::new(LoggingCustodian),
        Arc::new(LoggingIntake),
    ));

    info!(
        node_id = %node_id,
        expected_batch_size = config.expected_batch_size,
        min_net_amount = %config.min_net_amount,
        intake_actor = %config.intake_actor,
        purge_authority_actor = %config.purge_authority_actor,
        "Coordinator running"
    );

    // The coordinator is request/response only; hold the process open
    // until the shutdown signal.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let snapshot = coordinator.metrics().snapshot();
    info!(
        batches_forwarded = snapshot.batches_forwarded_total,
        amount_forwarded_micros = snapshot.amount_forwarded_micros,
        purges = snapshot.purges_total,
        "Coordinator shutdown complete"
    );
    Ok(())
}
