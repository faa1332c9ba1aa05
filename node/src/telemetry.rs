// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::errors::{NodeError, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const DEFAULT_LOG_FILTER: &str = "lightcall_node=info,lightcall_kernel=info";

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() -> Result<()> {
    // 1. Tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| NodeError::Telemetry(e.to_string()))?;

    // 2. Prometheus recorder, rendered on demand
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| NodeError::Telemetry(e.to_string()))?;

    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!("lightcall_lines_total", "Lines delivered by a line source");
    metrics::describe_counter!("lightcall_line_errors_total", "Lines whose handling failed");
    metrics::describe_counter!("lightcall_legs_matched_total", "Call leg pairs matched");
    metrics::describe_counter!("lightcall_legs_evicted_total", "Unmatched legs evicted after their TTL");
    metrics::describe_counter!("lightcall_append_written_total", "Lines written by an append sink");
    metrics::describe_counter!("lightcall_append_dropped_total", "Lines dropped by an append sink");

    metrics::gauge!("lightcall_node_up", 1.0);
    Ok(())
}

/// Render the current metrics snapshot.
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
