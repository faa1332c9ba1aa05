// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! lightcall-kernel: call leg correlation and CDC replay over a pluggable record store.
//!
//! Everything here is synchronous and deterministic given its inputs and the
//! injected [`clock::Clock`]. File tailing, append sinks and the runtime live in
//! the `lightcall-node` crate.

pub mod audit;
pub mod cdc;
pub mod clock;
pub mod config;
pub mod correlate;
pub mod error;
pub mod outcome;
pub mod recorder;
pub mod storage;
pub mod types;

pub use cdc::CdcProcessor;
pub use correlate::LegCorrelator;
pub use error::{KernelError, Result};
pub use outcome::CallOutcome;
pub use recorder::CallRecorder;
pub use storage::{MemoryStore, Record, RecordStore, StoreError};
pub use types::{LegRecord, LegRole, MatchedPair};

#[cfg(test)]
pub mod tests;
