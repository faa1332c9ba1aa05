// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Persists a matched call onto its activity and task.
//!
//! # Guarantees
//! - The activity update and the task's activity link are written in one
//!   transaction. Either both are visible or neither is.
//! - Existing keys in the activity's `rawlog` object are preserved; only
//!   `fslega`, `fslegb` and `state` are replaced.

use crate::config::{collections, fields};
use crate::error::{KernelError, Result};
use crate::outcome::CallOutcome;
use crate::storage::{Record, RecordStore};
use crate::types::MatchedPair;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

pub struct CallRecorder {
    store: Arc<dyn RecordStore>,
    record_dir: PathBuf,
}

impl CallRecorder {
    pub fn new(store: Arc<dyn RecordStore>, record_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            record_dir: record_dir.into(),
        }
    }

    pub fn record(&self, pair: &MatchedPair) -> Result<CallOutcome> {
        let a_leg = &pair.a_leg;
        let outcome = CallOutcome::from_pair(pair)?;

        let mut activity = self.load(collections::ACTIVITY, &a_leg.activity_id)?;
        let mut task = self.load(collections::TASK, &a_leg.task_id)?;
        task.append_to_list(fields::ACTIVITY, activity.id());

        let mut rawlog = activity.get_object(fields::RAWLOG);
        rawlog.insert("fslega".to_string(), serde_json::to_value(&pair.a_leg)?);
        rawlog.insert("fslegb".to_string(), serde_json::to_value(&pair.b_leg)?);
        rawlog.insert("state".to_string(), serde_json::to_value(&outcome)?);
        activity.set(fields::RAWLOG, Value::Object(rawlog));

        let answered_at = format_timestamp(a_leg.answer_epoch);
        activity.set(fields::USER, a_leg.user_id.as_str());
        activity.set(fields::COMMENT, outcome.summary());
        activity.set(fields::CREATED, answered_at.as_str());
        activity.set(fields::UPDATED, answered_at.as_str());
        activity.set(fields::IS_CALL, true);

        if outcome.connect_ok {
            self.attach_recording(&mut activity, &a_leg.record);
        }

        self.store.run_in_transaction(&mut |tx: &dyn RecordStore| -> Result<()> {
            tx.save(&mut activity.clone())?;
            tx.save(&mut task.clone())?;
            Ok(())
        })?;

        tracing::info!(
            activity_id = activity.id(),
            task_id = task.id(),
            connected = outcome.connect_ok,
            "Call recorded"
        );
        Ok(outcome)
    }

    fn load(&self, collection: &str, id: &str) -> Result<Record> {
        self.store
            .find_record_by_id(collection, id)?
            .ok_or_else(|| KernelError::not_found(collection, id))
    }

    fn attach_recording(&self, activity: &mut Record, file_name: &str) {
        let path = self.record_dir.join(file_name);
        if file_name.is_empty() || !path.is_file() {
            tracing::warn!(path = %path.display(), "Recording file missing, not attached");
            return;
        }
        activity.set(fields::RECORD, path.to_string_lossy().into_owned());
    }
}

fn format_timestamp(epoch: i64) -> String {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}
