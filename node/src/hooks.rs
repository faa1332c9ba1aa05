// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Store hooks that feed the audit logs.
//!
//! Activity events come from committed task saves. Open/close requests come
//! from the host's user-facing update path, which calls
//! [`AuditHooks::open_change_requested`] before applying the change.

use crate::sink::{AppendSink, AppendStatus};
use chrono::Utc;
use lightcall_kernel::audit::{self, ActivityCreatedEvent, ChangeRequestEvent};
use lightcall_kernel::config::collections;
use lightcall_kernel::storage::{MemoryStore, Record, RecordStore};
use serde::Serialize;
use std::sync::Arc;

pub struct AuditHooks {
    activity_log: Arc<AppendSink>,
    change_log: Arc<AppendSink>,
}

impl AuditHooks {
    pub fn new(activity_log: Arc<AppendSink>, change_log: Arc<AppendSink>) -> Self {
        Self {
            activity_log,
            change_log,
        }
    }

    /// Wire the hooks into `store`: native ext ids on create, activity events on save.
    pub fn install(self: &Arc<Self>, store: &Arc<MemoryStore>) {
        store.on_create(Arc::new(audit::assign_native_ext_id));

        let hooks = Arc::clone(self);
        let weak = Arc::downgrade(store);
        store.on_saved(Arc::new(move |before: Option<&Record>, after: &Record| {
            if after.collection() != collections::TASK {
                return;
            }
            if let Some(store) = weak.upgrade() {
                hooks.task_saved(store.as_ref(), before, after);
            }
        }));
    }

    /// Emit one `activity_created` event per activity newly linked to a CDC task.
    pub fn task_saved(&self, store: &dyn RecordStore, before: Option<&Record>, after: &Record) -> usize {
        let mut emitted = 0;
        for activity_id in audit::new_activity_ids(before, after) {
            let activity = match store.find_record_by_id(collections::ACTIVITY, &activity_id) {
                Ok(Some(activity)) => activity,
                Ok(None) => {
                    tracing::error!(task_id = after.id(), activity_id = %activity_id, "Linked activity not found");
                    continue;
                }
                Err(e) => {
                    tracing::error!(task_id = after.id(), activity_id = %activity_id, error = %e, "Failed to load activity");
                    continue;
                }
            };

            let event = ActivityCreatedEvent::new(after, &activity, Utc::now());
            if emit(&self.activity_log, &event) {
                emitted += 1;
            }
        }
        emitted
    }

    /// Forward a user's open/close of a CDC-created record to the business system.
    /// Returns whether a request was queued.
    pub fn open_change_requested(&self, before: &Record, after: &Record, requested_by: &str) -> bool {
        match ChangeRequestEvent::from_update(before, after, requested_by, Utc::now()) {
            Some(event) => emit(&self.change_log, &event),
            None => false,
        }
    }
}

fn emit<T: Serialize>(sink: &AppendSink, event: &T) -> bool {
    match serde_json::to_string(event) {
        Ok(line) => sink.append(line) == AppendStatus::Queued,
        Err(e) => {
            tracing::error!(sink = sink.name(), error = %e, "Failed to encode audit event");
            false
        }
    }
}
