// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Node lifecycle.
//!
//! # Start order
//! 1. Sinks open.
//! 2. Audit hooks are wired into the store.
//! 3. Sources start reading.
//!
//! # Shutdown order
//! 1. Sources stop reading and finish their in-flight line.
//! 2. The correlator sweeper stops.
//! 3. Sinks drain, sync and close.
//!
//! Nothing that can append to a sink is still running when the sink closes.

use crate::config::NodeConfig;
use crate::errors::{NodeError, Result};
use crate::hooks::AuditHooks;
use crate::ingest::{CdcHandler, CdrHandler, IngestHandler};
use crate::sink::AppendSink;
use crate::source::LineSource;
use lightcall_kernel::clock::{Clock, SystemClock};
use lightcall_kernel::{CallRecorder, CdcProcessor, LegCorrelator, MemoryStore, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Node {
    sources: Vec<LineSource>,
    source_cancel: CancellationToken,
    sweeper: JoinHandle<()>,
    sweep_cancel: CancellationToken,
    activity_log: Arc<AppendSink>,
    change_log: Arc<AppendSink>,
    hooks: Arc<AuditHooks>,
    correlator: Arc<LegCorrelator>,
}

impl Node {
    pub async fn start(config: NodeConfig, store: Arc<MemoryStore>) -> Result<Self> {
        Self::start_with_clock(config, store, Arc::new(SystemClock)).await
    }

    pub async fn start_with_clock(
        config: NodeConfig,
        store: Arc<MemoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let hooked = Arc::clone(&store);
        Self::start_with(config, store, clock, move |hooks| hooks.install(&hooked)).await
    }

    /// Start over any store. `install` runs once the sinks are open and before
    /// the first line is read, so every handled line sees the hooks.
    pub async fn start_with(
        config: NodeConfig,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        install: impl FnOnce(&Arc<AuditHooks>) + Send,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!("Starting lightcall node with config: {:?}", config);

        if !config.record_dir.is_dir() {
            tracing::warn!(path = %config.record_dir.display(), "Recording directory missing; recordings will not be attached");
        }

        let capacity = config.append_queue_capacity;
        let activity_log =
            Arc::new(AppendSink::start("activity", &config.activity_log_file, capacity).await?);
        let change_log = match AppendSink::start("change", &config.change_log_file, capacity).await {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                activity_log.close().await?;
                return Err(e.into());
            }
        };

        let hooks = Arc::new(AuditHooks::new(activity_log.clone(), change_log.clone()));
        install(&hooks);

        let correlator = Arc::new(LegCorrelator::new(config.leg_ttl, clock));
        let handlers = [
            IngestHandler::Cdr(CdrHandler::new(
                &config.cdr_file,
                correlator.clone(),
                CallRecorder::new(store.clone(), &config.record_dir),
            )),
            IngestHandler::Cdc(CdcHandler::new(
                &config.cdc_file,
                CdcProcessor::new(store.clone()),
            )),
        ];

        let source_cancel = CancellationToken::new();
        let mut sources = Vec::with_capacity(handlers.len());
        for handler in handlers {
            match LineSource::register(handler, config.poll_interval, source_cancel.child_token()).await {
                Ok(source) => sources.push(source),
                Err(e) => {
                    tracing::error!(error = %e, "Line source registration failed");
                    source_cancel.cancel();
                    for source in sources {
                        source.join().await;
                    }
                    activity_log.close().await?;
                    change_log.close().await?;
                    return Err(NodeError::Source(e));
                }
            }
        }

        let sweep_cancel = CancellationToken::new();
        let sweeper = tokio::spawn(run_sweeper(
            correlator.clone(),
            config.sweep_interval,
            sweep_cancel.clone(),
        ));

        tracing::info!("Node started");

        Ok(Self {
            sources,
            source_cancel,
            sweeper,
            sweep_cancel,
            activity_log,
            change_log,
            hooks,
            correlator,
        })
    }

    pub fn hooks(&self) -> &Arc<AuditHooks> {
        &self.hooks
    }

    pub fn correlator(&self) -> &Arc<LegCorrelator> {
        &self.correlator
    }

    pub async fn shutdown(self) -> Result<()> {
        tracing::info!("Shutting down node");

        self.source_cancel.cancel();
        for source in self.sources {
            source.join().await;
        }

        self.sweep_cancel.cancel();
        if let Err(e) = self.sweeper.await {
            tracing::error!(error = %e, "Sweeper task failed");
        }

        let activity = self.activity_log.close().await;
        let change = self.change_log.close().await;
        activity?;
        change?;

        tracing::info!("Node stopped");
        Ok(())
    }
}

async fn run_sweeper(correlator: Arc<LegCorrelator>, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    // First tick completes immediately.
    interval.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let evicted = correlator.sweep();
                if evicted > 0 {
                    metrics::counter!("lightcall_legs_evicted_total", evicted as u64);
                }
                let (a_legs, b_legs) = correlator.pending();
                tracing::debug!(evicted, a_legs, b_legs, "Swept correlation caches");
            }
        }
    }
}
