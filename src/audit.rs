// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Audit events forwarded to the business system.
//!
//! Only records that came from CDC are reported back. A record is "native"
//! when it was created locally, which shows as an empty ext id or an ext id
//! equal to its own id.

use crate::config::{collections, fields};
use crate::storage::Record;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

pub const ACTIVITY_CREATED: &str = "activity_created";
pub const OPEN_REQUEST: &str = "open_request";
pub const CLOSE_REQUEST: &str = "close_request";
pub const USER_REQUEST_REASON: &str = "用户操作";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityData {
    pub comment: String,
    pub is_call: bool,
    pub user: String,
    pub record: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCreatedEvent {
    pub event_type: String,
    pub task_id: String,
    pub task_ext_id: String,
    pub activity_id: String,
    pub timestamp: DateTime<Utc>,
    pub activity_data: ActivityData,
}

impl ActivityCreatedEvent {
    pub fn new(task: &Record, activity: &Record, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type: ACTIVITY_CREATED.to_string(),
            task_id: task.id().to_string(),
            task_ext_id: task.get_str(fields::EXT_ID).to_string(),
            activity_id: activity.id().to_string(),
            timestamp,
            activity_data: ActivityData {
                comment: activity.get_str(fields::COMMENT).to_string(),
                is_call: activity.get_bool(fields::IS_CALL),
                user: activity.get_str(fields::USER).to_string(),
                record: activity.get_str(fields::RECORD).to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestEvent {
    pub event_type: String,
    pub id: String,
    #[serde(rename = "ext_id")]
    pub ext_id: String,
    pub timestamp: DateTime<Utc>,
    pub requested_by: String,
    pub reason: String,
    pub entity_type: String,
}

impl ChangeRequestEvent {
    /// Event for a user flipping the `open` flag of a CDC-created record.
    /// `None` for native records or when the flag did not change.
    pub fn from_update(
        before: &Record,
        after: &Record,
        requested_by: &str,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        if is_native(after) {
            return None;
        }
        let open = after.get_bool(fields::OPEN);
        if before.get_bool(fields::OPEN) == open {
            return None;
        }

        Some(Self {
            event_type: if open { OPEN_REQUEST } else { CLOSE_REQUEST }.to_string(),
            id: after.id().to_string(),
            ext_id: after.get_str(fields::EXT_ID).to_string(),
            timestamp,
            requested_by: requested_by.to_string(),
            reason: USER_REQUEST_REASON.to_string(),
            entity_type: after.collection().to_string(),
        })
    }
}

pub fn is_native(record: &Record) -> bool {
    let ext_id = record.get_str(fields::EXT_ID);
    ext_id.is_empty() || ext_id == record.id()
}

/// Activity ids linked to a CDC-created task by this update.
pub fn new_activity_ids(before: Option<&Record>, after: &Record) -> Vec<String> {
    if after.collection() != collections::TASK || is_native(after) {
        return Vec::new();
    }
    let seen: FxHashSet<String> = before
        .map(|r| r.get_string_list(fields::ACTIVITY))
        .unwrap_or_default()
        .into_iter()
        .collect();

    after
        .get_string_list(fields::ACTIVITY)
        .into_iter()
        .filter(|id| !seen.contains(id))
        .collect()
}

/// Create hook for tasks and objectives: a record created without an ext id
/// takes its own id as ext id.
pub fn assign_native_ext_id(record: &mut Record) {
    let tracked = matches!(
        record.collection(),
        collections::TASK | collections::OBJECTIVE
    );
    if tracked && record.get_str(fields::EXT_ID).is_empty() {
        let id = record.id().to_string();
        record.set(fields::EXT_ID, id);
    }
}
