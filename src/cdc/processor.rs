// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Replays CDC operations against the record store.
//!
//! | op              | objective          | task                 |
//! |-----------------|--------------------|----------------------|
//! | create          | upsert by ext id   | create, dup is error |
//! | update          | upsert by ext id   | unknown              |
//! | open / close    | set `open` flag    | set `open` flag      |
//!
//! Every other combination fails with `UnknownOperation` before anything is read
//! from or written to the store.

use super::{CdcMessage, CdcOp, EntityKind, ObjectivePayload, StatusPayload, TaskPayload};
use crate::config::{collections, fields, PROVISIONED_USER_NAME};
use crate::error::{KernelError, Result};
use crate::storage::{Record, RecordStore};
use serde_json::json;
use std::sync::Arc;

pub struct CdcProcessor {
    store: Arc<dyn RecordStore>,
}

impl CdcProcessor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Parse and apply one CDC line.
    pub fn deal(&self, line: &str) -> Result<()> {
        let msg = CdcMessage::parse(line)?;
        self.apply(&msg)
    }

    pub fn apply(&self, msg: &CdcMessage) -> Result<()> {
        match (msg.op(), msg.kind()) {
            (Some(CdcOp::Open), Some(kind)) => self.set_open(kind, payload(msg)?, true),
            (Some(CdcOp::Close), Some(kind)) => self.set_open(kind, payload(msg)?, false),
            (Some(CdcOp::Create | CdcOp::Update), Some(EntityKind::Objective)) => {
                self.upsert_objective(payload(msg)?)
            }
            (Some(CdcOp::Create), Some(EntityKind::Task)) => self.create_task(payload(msg)?),
            _ => Err(KernelError::UnknownOperation {
                op: msg.msg_op.clone(),
                kind: msg.msg_type.clone(),
            }),
        }
    }

    fn set_open(&self, kind: EntityKind, status: StatusPayload, open: bool) -> Result<()> {
        let collection = kind.collection();
        self.store.find_collection(collection)?;

        let mut record = match status.ext_id.as_str() {
            "" => None,
            ext_id => self.store.find_record_by_external_id(collection, ext_id)?,
        }
        .ok_or_else(|| KernelError::not_found(collection, status.ext_id.as_str()))?;

        record.set(fields::OPEN, open);
        self.store.save(&mut record)?;

        tracing::info!(collection, ext_id = %status.ext_id, open, "Open flag updated");
        Ok(())
    }

    fn upsert_objective(&self, objective: ObjectivePayload) -> Result<()> {
        let collection = collections::OBJECTIVE;
        if objective.ext_id.is_empty() {
            return Err(KernelError::not_found(collection, ""));
        }
        let mut record = match self
            .store
            .find_record_by_external_id(collection, &objective.ext_id)?
        {
            Some(existing) => existing,
            None => self.store.new_record(collection)?,
        };

        record.set(fields::EXT_ID, objective.ext_id.as_str());
        record.set(fields::TITLE, objective.title.as_str());
        record.set(
            fields::INFO,
            json!({
                "company": objective.info.company,
                "background": objective.info.background,
            }),
        );
        record.set(fields::OPEN, true);
        self.store.save(&mut record)?;

        tracing::info!(ext_id = %objective.ext_id, id = record.id(), "Objective upserted");
        Ok(())
    }

    fn create_task(&self, task: TaskPayload) -> Result<()> {
        let collection = collections::TASK;
        if self
            .store
            .find_record_by_external_id(collection, &task.ext_id)?
            .is_some()
        {
            return Err(KernelError::Duplicate {
                collection: collection.to_string(),
                ext_id: task.ext_id,
            });
        }

        let owner = self.resolve_user(&task.own)?;
        let mut task_id = String::new();

        self.store.run_in_transaction(&mut |tx: &dyn RecordStore| -> Result<()> {
            let mut record = tx.new_record(collection)?;
            record.set(fields::EXT_ID, task.ext_id.as_str());
            record.set(fields::OWN, owner.id());
            record.set(fields::CONTACT, task.contact.as_str());
            record.set(fields::CALLEE, task.callee.as_str());
            record.set(fields::DESC, task.desc.as_str());
            record.set(fields::OPEN, true);
            tx.save(&mut record)?;

            if !task.objective_title.is_empty() {
                let mut objective = tx
                    .find_first_by_field(collections::OBJECTIVE, fields::TITLE, &task.objective_title)?
                    .ok_or_else(|| {
                        KernelError::not_found(collections::OBJECTIVE, task.objective_title.as_str())
                    })?;
                objective.append_to_list(fields::TASKS, record.id());
                tx.save(&mut objective)?;
            }

            task_id = record.id().to_string();
            Ok(())
        })?;

        tracing::info!(
            ext_id = %task.ext_id,
            id = %task_id,
            callee = %task.callee,
            contact = %task.contact,
            "Task created"
        );
        Ok(())
    }

    /// Find the user owning `email`, provisioning an inactive, unverified,
    /// non-admin account when none exists.
    fn resolve_user(&self, email: &str) -> Result<Record> {
        let collection = collections::USERS;
        if let Some(user) = self.store.find_first_by_field(collection, fields::EMAIL, email)? {
            return Ok(user);
        }

        let mut user = self.store.new_record(collection)?;
        user.set(fields::EMAIL, email);
        user.set(fields::EMAIL_VISIBILITY, true);
        user.set(fields::VERIFIED, false);
        user.set(fields::NAME, PROVISIONED_USER_NAME);
        user.set(fields::IS_ADMIN, false);
        user.set(fields::ACTIVE, false);
        self.store.save(&mut user).map_err(|e| {
            tracing::error!(email, error = %e, "Failed to provision user");
            e
        })?;

        tracing::info!(email, id = user.id(), "User provisioned");
        Ok(user)
    }
}

fn payload<T: serde::de::DeserializeOwned>(msg: &CdcMessage) -> Result<T> {
    Ok(serde_json::from_value(msg.event.clone())?)
}
