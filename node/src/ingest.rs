// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-stream line handlers.
//!
//! One variant per input stream. A [`crate::source::LineSource`] owns exactly
//! one handler and calls [`IngestHandler::deal`] for each line, in order.

use lightcall_kernel::error::Result;
use lightcall_kernel::{CallRecorder, CdcProcessor, LegCorrelator, LegRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub enum IngestHandler {
    Cdr(CdrHandler),
    Cdc(CdcHandler),
}

impl IngestHandler {
    pub fn file(&self) -> &Path {
        match self {
            IngestHandler::Cdr(h) => &h.file,
            IngestHandler::Cdc(h) => &h.file,
        }
    }

    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestHandler::Cdr(_) => "cdr",
            IngestHandler::Cdc(_) => "cdc",
        }
    }

    pub fn deal(&self, line: &str) -> Result<()> {
        match self {
            IngestHandler::Cdr(h) => h.deal(line),
            IngestHandler::Cdc(h) => h.deal(line),
        }
    }
}

/// Call detail records: correlate legs, persist matched calls.
pub struct CdrHandler {
    file: PathBuf,
    correlator: Arc<LegCorrelator>,
    recorder: CallRecorder,
}

impl CdrHandler {
    pub fn new(file: impl Into<PathBuf>, correlator: Arc<LegCorrelator>, recorder: CallRecorder) -> Self {
        Self {
            file: file.into(),
            correlator,
            recorder,
        }
    }

    pub fn deal(&self, line: &str) -> Result<()> {
        let leg = LegRecord::parse(line)?;
        let Some(pair) = self.correlator.observe(leg) else {
            return Ok(());
        };

        metrics::increment_counter!("lightcall_legs_matched_total");
        tracing::debug!(a_leg = %pair.a_leg.uuid, b_leg = %pair.b_leg.uuid, "Legs matched");
        self.recorder.record(&pair)?;
        Ok(())
    }
}

/// Change data capture from the business system.
pub struct CdcHandler {
    file: PathBuf,
    processor: CdcProcessor,
}

impl CdcHandler {
    pub fn new(file: impl Into<PathBuf>, processor: CdcProcessor) -> Self {
        Self {
            file: file.into(),
            processor,
        }
    }

    pub fn deal(&self, line: &str) -> Result<()> {
        self.processor.deal(line)
    }
}
