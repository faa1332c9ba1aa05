// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only audit log writer.
//!
//! Producers hand over pre-serialized lines; one background worker writes
//! them in arrival order, one line per entry.
//!
//! # Guarantees
//! - `append` never blocks. A full queue drops the newest line; a closing
//!   sink drops everything offered after `close` started.
//! - Every line accepted before `close` is written, flushed and synced before
//!   `close` returns.
//! - The file is opened once, in append mode, for the sink's lifetime.
//! - A failed write drops that line and the worker keeps going. Only the
//!   final flush and sync can make `close` fail.

use crate::errors::{SinkError, SinkResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What happened to a line offered to [`AppendSink::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendStatus {
    Queued,
    DroppedFull,
    DroppedClosing,
}

pub struct AppendSink {
    name: String,
    path: PathBuf,
    tx: mpsc::Sender<String>,
    closing: Arc<AtomicBool>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<SinkResult<u64>>>>,
}

/// Consumer half of a sink, not yet running.
pub struct AppendWorker {
    name: String,
    file: File,
    rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
}

impl AppendSink {
    /// Open `path` for appending and start the worker.
    pub async fn start(name: &str, path: impl AsRef<Path>, capacity: usize) -> SinkResult<Self> {
        let (sink, worker) = Self::open(name, path, capacity).await?;
        sink.run(worker)?;
        Ok(sink)
    }

    /// Open `path` and build the queue without starting the worker.
    pub async fn open(
        name: &str,
        path: impl AsRef<Path>,
        capacity: usize,
    ) -> SinkResult<(Self, AppendWorker)> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o644);
        let file = options.open(&path).await?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();

        let sink = Self {
            name: name.to_string(),
            path,
            tx,
            closing: Arc::new(AtomicBool::new(false)),
            cancel: cancel.clone(),
            worker: Mutex::new(None),
        };
        let worker = AppendWorker {
            name: name.to_string(),
            file,
            rx,
            cancel,
        };
        Ok((sink, worker))
    }

    /// Spawn `worker` on the current runtime and attach it to this sink.
    pub fn run(&self, worker: AppendWorker) -> SinkResult<()> {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(SinkError::WorkerAttached(self.name.clone()));
        }
        *slot = Some(tokio::spawn(worker.run()));
        tracing::info!(sink = %self.name, path = %self.path.display(), "Append sink started");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append(&self, line: impl Into<String>) -> AppendStatus {
        if self.closing.load(Ordering::Acquire) {
            return self.dropped("closing", AppendStatus::DroppedClosing);
        }
        match self.tx.try_send(line.into()) {
            Ok(()) => AppendStatus::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped("full", AppendStatus::DroppedFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped("closing", AppendStatus::DroppedClosing)
            }
        }
    }

    /// Stop accepting lines, drain the queue and close the file.
    pub async fn close(&self) -> SinkResult<()> {
        if self.closing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.cancel.cancel();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            tracing::warn!(sink = %self.name, "Append sink closed without a worker");
            return Ok(());
        };

        let written = handle
            .await
            .map_err(|_| SinkError::WorkerFailed(self.name.clone()))??;
        tracing::info!(sink = %self.name, written, "Append sink drained and closed");
        Ok(())
    }

    fn dropped(&self, reason: &'static str, status: AppendStatus) -> AppendStatus {
        tracing::warn!(sink = %self.name, reason, "Append sink dropped line");
        metrics::increment_counter!(
            "lightcall_append_dropped_total",
            "sink" => self.name.clone(),
            "reason" => reason
        );
        status
    }
}

impl AppendWorker {
    async fn run(mut self) -> SinkResult<u64> {
        let mut written = 0u64;

        loop {
            tokio::select! {
                biased;
                next = self.rx.recv() => match next {
                    Some(line) => written += self.write(&line).await,
                    None => break,
                },
                _ = self.cancel.cancelled() => break,
            }
        }

        // Refuse new sends, then write whatever is still buffered.
        self.rx.close();
        while let Some(line) = self.rx.recv().await {
            written += self.write(&line).await;
        }

        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(written)
    }

    /// Write one line. A failed write drops that line only; returns lines written.
    async fn write(&mut self, line: &str) -> u64 {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let result = match self.file.write_all(&buf).await {
            Ok(()) => self.file.flush().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                metrics::increment_counter!("lightcall_append_written_total", "sink" => self.name.clone());
                1
            }
            Err(e) => {
                tracing::error!(sink = %self.name, error = %e, "Append sink write failed; line dropped");
                metrics::increment_counter!(
                    "lightcall_append_dropped_total",
                    "sink" => self.name.clone(),
                    "reason" => "write"
                );
                0
            }
        }
    }
}
