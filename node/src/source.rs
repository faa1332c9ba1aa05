// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! File tailing.
//!
//! A [`LineSource`] polls one file and feeds every complete line appended to
//! it to one [`IngestHandler`], in order, from a single task.
//!
//! # Guarantees
//! - Reading starts at the end of the file as it was at registration.
//! - Truncation, rename-and-recreate (new inode) and in-place rewrites restart
//!   reading from offset 0 of the new content. A rewrite is seen when either
//!   the first 64 bytes or the 64 bytes just before the read offset changed.
//!   The unterminated tail of the old content is discarded.
//! - A rewrite that reproduces every byte already read and then grows looks
//!   exactly like an append and is read as one. Modification times are not
//!   consulted, so touching the file never replays it.
//! - Handlers run on the blocking pool, one line at a time.
//! - Handler errors are logged and counted; the next line is still delivered.
//! - After cancellation no new line is handed out; [`LineSource::stop`]
//!   returns once the line being handled, if any, is done.

use crate::errors::{SourceError, SourceResult};
use crate::ingest::IngestHandler;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const MAX_READ_CHUNK_BYTES: u64 = 1024 * 1024;
const FINGERPRINT_BYTES: u64 = 64;

pub struct LineSource {
    path: PathBuf,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LineSource {
    /// Check the watched file and spawn its delivery loop.
    ///
    /// Fails when the path is empty or the file or its directory is missing.
    pub async fn register(
        handler: IngestHandler,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> SourceResult<Self> {
        let path = handler.file().to_path_buf();
        check_watchable(&path).await?;

        let position = Position::at_end(&path).await?;
        tracing::info!(
            source = handler.kind(),
            path = %path.display(),
            offset = position.offset,
            "Line source started"
        );

        let tail = Tail {
            path: path.clone(),
            handler: Arc::new(handler),
            poll_interval,
            cancel: cancel.clone(),
            position,
            pending: Vec::new(),
        };
        let task = tokio::spawn(tail.run());

        Ok(Self { path, cancel, task })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cancel and wait for the in-flight line to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the delivery loop to exit after its token is cancelled elsewhere.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(path = %self.path.display(), error = %e, "Line source task failed");
        }
    }
}

async fn check_watchable(path: &Path) -> SourceResult<()> {
    if path.as_os_str().is_empty() {
        return Err(SourceError::EmptyPath);
    }
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    match fs::metadata(&dir).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return Err(SourceError::MissingDirectory(dir)),
    }
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(SourceError::MissingFile(path.to_path_buf())),
    }
}

/// Where the reader is and what the file looked like when it got there.
#[derive(Debug, Default, Clone, PartialEq)]
struct Position {
    offset: u64,
    inode: Option<u64>,
    /// First bytes of the file.
    head: Vec<u8>,
    /// Bytes just before `offset`.
    tail: Vec<u8>,
}

impl Position {
    async fn at_end(path: &Path) -> SourceResult<Self> {
        let meta = fs::metadata(path).await?;
        let offset = meta.len();
        let window = offset.min(FINGERPRINT_BYTES);
        Ok(Self {
            offset,
            inode: inode_of(&meta),
            head: read_range(path, 0, window).await?,
            tail: read_range(path, offset - window, window).await?,
        })
    }

    fn restart(meta: &std::fs::Metadata) -> Self {
        Self {
            inode: inode_of(meta),
            ..Self::default()
        }
    }
}

struct Tail {
    path: PathBuf,
    handler: Arc<IngestHandler>,
    poll_interval: Duration,
    cancel: CancellationToken,
    position: Position,
    pending: Vec<u8>,
}

impl Tail {
    async fn run(mut self) {
        loop {
            if let Err(e) = self.poll().await {
                tracing::debug!(path = %self.path.display(), error = %e, "Poll failed; retrying");
            }
            if self.cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.poll_interval) => {}
            }
        }
        tracing::info!(source = self.handler.kind(), path = %self.path.display(), "Line source stopped");
    }

    /// Read everything appended since the last poll and deliver complete lines.
    async fn poll(&mut self) -> std::io::Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let meta = fs::metadata(&self.path).await?;
            if self.replaced(&meta).await? {
                tracing::warn!(
                    path = %self.path.display(),
                    previous_offset = self.position.offset,
                    current_size = meta.len(),
                    "File truncated or rotated; reading from start"
                );
                self.position = Position::restart(&meta);
                self.pending.clear();
            }

            let available = meta.len().saturating_sub(self.position.offset);
            if available == 0 {
                return Ok(());
            }

            let chunk = read_range(
                &self.path,
                self.position.offset,
                available.min(MAX_READ_CHUNK_BYTES),
            )
            .await?;
            if chunk.is_empty() {
                return Ok(());
            }
            self.position.offset += chunk.len() as u64;
            self.refresh_head(&chunk);
            self.refresh_tail(&chunk);
            self.pending.extend_from_slice(&chunk);
            self.deliver_complete_lines().await;
        }
    }

    async fn replaced(&self, meta: &std::fs::Metadata) -> std::io::Result<bool> {
        if meta.len() < self.position.offset {
            return Ok(true);
        }
        let inode = inode_of(meta);
        if inode.is_some() && self.position.inode.is_some() && inode != self.position.inode {
            return Ok(true);
        }
        if !self.position.head.is_empty() {
            let head = read_range(&self.path, 0, self.position.head.len() as u64).await?;
            if head != self.position.head {
                return Ok(true);
            }
        }
        if !self.position.tail.is_empty() {
            let len = self.position.tail.len() as u64;
            let tail = read_range(&self.path, self.position.offset - len, len).await?;
            if tail != self.position.tail {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn refresh_head(&mut self, chunk: &[u8]) {
        let known = self.position.head.len() as u64;
        let chunk_start = self.position.offset - chunk.len() as u64;
        if known >= FINGERPRINT_BYTES || chunk_start > known {
            return;
        }
        let skip = (known - chunk_start) as usize;
        let take = (FINGERPRINT_BYTES - known) as usize;
        let extra = chunk.iter().skip(skip).take(take).copied();
        self.position.head.extend(extra);
    }

    fn refresh_tail(&mut self, chunk: &[u8]) {
        let keep = FINGERPRINT_BYTES as usize;
        let tail = &mut self.position.tail;
        tail.extend_from_slice(&chunk[chunk.len().saturating_sub(keep)..]);
        let excess = tail.len().saturating_sub(keep);
        tail.drain(..excess);
    }

    async fn deliver_complete_lines(&mut self) {
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return;
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        for raw in complete.split(|b| *b == b'\n') {
            if self.cancel.is_cancelled() {
                return;
            }
            let line = String::from_utf8_lossy(raw);
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            self.deliver(line.to_string()).await;
        }
    }

    async fn deliver(&self, line: String) {
        let source = self.handler.kind();
        metrics::increment_counter!("lightcall_lines_total", "source" => source);

        let handler = Arc::clone(&self.handler);
        let outcome = tokio::task::spawn_blocking(move || {
            let result = handler.deal(&line);
            (line, result)
        })
        .await;

        match outcome {
            Ok((_, Ok(()))) => tracing::debug!(source, "Line handled"),
            Ok((line, Err(e))) => {
                metrics::increment_counter!("lightcall_line_errors_total", "source" => source);
                tracing::error!(source, line = %line, error = %e, "Line handling failed");
            }
            Err(e) => {
                metrics::increment_counter!("lightcall_line_errors_total", "source" => source);
                tracing::error!(source, error = %e, "Line handler panicked");
            }
        }
    }
}

async fn read_range(path: &Path, start: u64, len: u64) -> std::io::Result<Vec<u8>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    let mut file = fs::File::open(path).await?;
    file.seek(SeekFrom::Start(start)).await?;
    let mut buf = Vec::with_capacity(len as usize);
    file.take(len).read_to_end(&mut buf).await?;
    Ok(buf)
}

#[cfg(unix)]
fn inode_of(meta: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn inode_of(_meta: &std::fs::Metadata) -> Option<u64> {
    None
}
