// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod hooks;
pub mod ingest;
pub mod runtime;
pub mod sink;
pub mod source;
pub mod telemetry;

pub use runtime::Node;
