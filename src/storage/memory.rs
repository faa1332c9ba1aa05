// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory record store.
//!
//! Transactions run against a staged clone of the whole store while the store
//! lock is held. On success the clone replaces the live state, on error it is
//! dropped. Readers therefore see either every write of a transaction or none.
//!
//! # Invariants
//! - Ids are 15 characters, assigned sequentially, and sort in creation order.
//! - Save observers run after the lock is released and only for committed writes.

use super::{Record, RecordStore, StoreError, StoreResult, TxWork};
use crate::error::KernelResult;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Runs on a record right after it receives its id, before it is stored.
pub type CreateHook = Arc<dyn Fn(&mut Record) + Send + Sync>;

/// Receives (previous version, saved version) for every committed save.
pub type SaveObserver = Arc<dyn Fn(Option<&Record>, &Record) + Send + Sync>;

#[derive(Clone, Default)]
struct State {
    collections: BTreeMap<String, BTreeMap<String, Record>>,
    next_id: u64,
    failing: FxHashSet<String>,
}

struct SavedChange {
    before: Option<Record>,
    after: Record,
}

impl State {
    fn rows(&self, collection: &str) -> StoreResult<&BTreeMap<String, Record>> {
        self.collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    fn find_first(&self, collection: &str, field: &str, value: &str) -> StoreResult<Option<Record>> {
        Ok(self
            .rows(collection)?
            .values()
            .find(|r| r.get(field).and_then(|v| v.as_str()) == Some(value))
            .cloned())
    }

    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        Ok(self.rows(collection)?.get(id).cloned())
    }

    fn save(&mut self, record: &mut Record, on_create: &[CreateHook]) -> StoreResult<SavedChange> {
        let collection = record.collection().to_string();
        self.rows(&collection)?;

        if self.failing.contains(&collection) {
            return Err(StoreError::SaveFailed {
                collection,
                id: record.id().to_string(),
                reason: "save rejected by backend".to_string(),
            });
        }

        let before = if record.is_new() {
            self.next_id += 1;
            record.set_id(format!("r{:014}", self.next_id));
            for hook in on_create {
                hook(&mut *record);
            }
            None
        } else {
            let existing = self.rows(&collection)?.get(record.id()).cloned();
            if existing.is_none() {
                return Err(StoreError::RecordNotFound {
                    collection,
                    id: record.id().to_string(),
                });
            }
            existing
        };

        if let Some(rows) = self.collections.get_mut(&collection) {
            rows.insert(record.id().to_string(), record.clone());
        }

        Ok(SavedChange {
            before,
            after: record.clone(),
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    on_create: RwLock<Vec<CreateHook>>,
    observers: RwLock<Vec<SaveObserver>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(names: &[&str]) -> Self {
        let store = Self::new();
        for name in names {
            store.add_collection(name);
        }
        store
    }

    pub fn add_collection(&self, name: &str) {
        self.lock().collections.entry(name.to_string()).or_default();
    }

    pub fn on_create(&self, hook: CreateHook) {
        self.on_create
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    pub fn on_saved(&self, observer: SaveObserver) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Make every subsequent save into `collection` fail.
    pub fn fail_saves_to(&self, collection: &str) {
        self.lock().failing.insert(collection.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    pub fn count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.lock()
            .collections
            .get(collection)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_hooks(&self) -> Vec<CreateHook> {
        self.on_create
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notify(&self, changes: Vec<SavedChange>) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for change in &changes {
            for observer in &observers {
                observer(change.before.as_ref(), &change.after);
            }
        }
    }
}

impl RecordStore for MemoryStore {
    fn find_collection(&self, name: &str) -> StoreResult<()> {
        self.lock().rows(name).map(|_| ())
    }

    fn find_first_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<Option<Record>> {
        self.lock().find_first(collection, field, value)
    }

    fn find_record_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        self.lock().find_by_id(collection, id)
    }

    fn save(&self, record: &mut Record) -> StoreResult<()> {
        let hooks = self.create_hooks();
        let change = self.lock().save(record, &hooks)?;
        self.notify(vec![change]);
        Ok(())
    }

    fn run_in_transaction(&self, work: &mut TxWork<'_>) -> KernelResult<()> {
        let hooks = self.create_hooks();
        let mut live = self.lock();
        let tx = TxStore {
            staged: Mutex::new(live.clone()),
            changes: Mutex::new(Vec::new()),
            on_create: hooks,
        };

        if let Err(e) = work(&tx) {
            tracing::debug!(error = %e, "Transaction rolled back");
            return Err(e);
        }

        let TxStore {
            staged, changes, ..
        } = tx;
        *live = staged.into_inner().unwrap_or_else(PoisonError::into_inner);
        drop(live);

        self.notify(changes.into_inner().unwrap_or_else(PoisonError::into_inner));
        Ok(())
    }
}

/// Transaction handle over a staged copy of the store.
struct TxStore {
    staged: Mutex<State>,
    changes: Mutex<Vec<SavedChange>>,
    on_create: Vec<CreateHook>,
}

impl TxStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for TxStore {
    fn find_collection(&self, name: &str) -> StoreResult<()> {
        self.lock().rows(name).map(|_| ())
    }

    fn find_first_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<Option<Record>> {
        self.lock().find_first(collection, field, value)
    }

    fn find_record_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        self.lock().find_by_id(collection, id)
    }

    fn save(&self, record: &mut Record) -> StoreResult<()> {
        let change = self.lock().save(record, &self.on_create)?;
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(change);
        Ok(())
    }

    // Nested transactions join the outer one.
    fn run_in_transaction(&self, work: &mut TxWork<'_>) -> KernelResult<()> {
        work(self)
    }
}
