// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Context;
use lightcall_kernel::config::collections;
use lightcall_kernel::MemoryStore;
use lightcall_node::config::NodeConfig;
use lightcall_node::{telemetry, Node};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry()?;

    let cfg = NodeConfig::from_env().context("loading configuration")?;

    let store = Arc::new(MemoryStore::with_collections(&[
        collections::USERS,
        collections::TASK,
        collections::OBJECTIVE,
        collections::ACTIVITY,
    ]));

    let node = Node::start(cfg, store).await.context("starting node")?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    node.shutdown().await.context("shutting down node")?;
    tracing::info!("Final metrics:\n{}", telemetry::get_metrics());
    Ok(())
}
