// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Record store collaborator.
//!
//! The domain core never owns persistence. Everything it writes goes through
//! [`RecordStore`], which the host application implements. [`MemoryStore`] is
//! the in-process reference implementation used by the node binary and tests.
//!
//! # Guarantees expected from implementations
//! - `save` assigns an id to new records and persists every field.
//! - `run_in_transaction` is all-or-nothing: when the closure fails, no save
//!   made through the transaction handle is visible to any reader.

pub mod memory;
pub mod record;

pub use memory::MemoryStore;
pub use record::Record;

use crate::config::fields;
use crate::error::KernelResult;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("record {id} not found in {collection}")]
    RecordNotFound { collection: String, id: String },

    /// Backend refused the write (I/O, constraint violation).
    #[error("save failed for {collection}/{id}: {reason}")]
    SaveFailed {
        collection: String,
        id: String,
        reason: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Unit of work run inside [`RecordStore::run_in_transaction`].
pub type TxWork<'a> = dyn FnMut(&dyn RecordStore) -> KernelResult<()> + 'a;

pub trait RecordStore: Send + Sync {
    /// Fails with `CollectionNotFound` when `name` is not a known collection.
    fn find_collection(&self, name: &str) -> StoreResult<()>;

    /// First record (in id order) whose `field` holds the string `value`.
    fn find_first_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<Option<Record>>;

    fn find_record_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Record>>;

    fn find_record_by_external_id(
        &self,
        collection: &str,
        ext_id: &str,
    ) -> StoreResult<Option<Record>> {
        self.find_first_by_field(collection, fields::EXT_ID, ext_id)
    }

    fn new_record(&self, collection: &str) -> StoreResult<Record> {
        self.find_collection(collection)?;
        Ok(Record::new(collection))
    }

    /// Persist `record`, assigning its id when it is new.
    fn save(&self, record: &mut Record) -> StoreResult<()>;

    /// Run `work` against a transactional view of the store.
    fn run_in_transaction(&self, work: &mut TxWork<'_>) -> KernelResult<()>;
}
