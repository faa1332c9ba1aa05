// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    /// A line did not parse as the expected JSON shape.
    #[error("malformed input: {0}")]
    Parse(#[from] serde_json::Error),

    /// The CDC envelope names an (op, entity) pair with no handler.
    #[error("unknown operation {op:?} for entity type {kind:?}")]
    UnknownOperation { op: String, kind: String },

    /// A record referenced by external id, id or field value does not exist.
    #[error("{collection} not found: {key}")]
    NotFound { collection: String, key: String },

    /// Task create for an external id that is already present.
    #[error("{collection} already exists: {ext_id}")]
    Duplicate { collection: String, ext_id: String },

    /// Leg timing fields that cannot describe a real call.
    #[error("malformed leg {uuid}: {reason}")]
    MalformedLeg { uuid: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl KernelError {
    pub fn not_found(collection: &str, key: impl Into<String>) -> Self {
        KernelError::NotFound {
            collection: collection.to_string(),
            key: key.into(),
        }
    }
}

pub type KernelResult<T> = std::result::Result<T, KernelError>;
pub type Result<T> = KernelResult<T>;
