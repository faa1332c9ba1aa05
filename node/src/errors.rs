// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use lightcall_kernel::error::KernelError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("append sink {0} already has a running worker")]
    WorkerAttached(String),

    #[error("append worker for {0} terminated abnormally")]
    WorkerFailed(String),
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("watched file path is empty")]
    EmptyPath,

    #[error("directory of watched file does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("watched file does not exist: {0}")]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),

    #[error("append sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("line source error: {0}")]
    Source(#[from] SourceError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

pub type Result<T> = std::result::Result<T, NodeError>;
