// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Change-data-capture messages from the business system.
//!
//! Each CDC line is an envelope naming an operation and an entity kind, with
//! the entity payload left opaque until dispatch.

pub mod processor;

pub use processor::CdcProcessor;

use crate::config::collections;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdcMessage {
    pub msg_op: String,
    pub msg_type: String,
    #[serde(default)]
    pub event: Value,
}

impl CdcMessage {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn op(&self) -> Option<CdcOp> {
        CdcOp::from_name(&self.msg_op)
    }

    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_name(&self.msg_type)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CdcOp {
    Create,
    Update,
    Open,
    Close,
}

impl CdcOp {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "create" => Some(CdcOp::Create),
            "update" => Some(CdcOp::Update),
            "open" => Some(CdcOp::Open),
            "close" => Some(CdcOp::Close),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Objective,
}

impl EntityKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            collections::TASK => Some(EntityKind::Task),
            collections::OBJECTIVE => Some(EntityKind::Objective),
            _ => None,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Task => collections::TASK,
            EntityKind::Objective => collections::OBJECTIVE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveInfo {
    pub company: String,
    pub background: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectivePayload {
    pub ext_id: String,
    pub title: String,
    pub info: ObjectiveInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPayload {
    /// Title of the objective the task belongs to. Empty means unlinked.
    pub objective_title: String,
    pub ext_id: String,
    /// Owner's email; resolved to (or provisioned as) a user record.
    pub own: String,
    pub contact: String,
    pub callee: String,
    pub desc: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPayload {
    pub ext_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_dispatch_names() {
        let msg = CdcMessage::parse(r#"{"msg_op":"close","msg_type":"objective","event":{"ext_id":"o1"}}"#).unwrap();
        assert_eq!(msg.op(), Some(CdcOp::Close));
        assert_eq!(msg.kind(), Some(EntityKind::Objective));

        let odd = CdcMessage::parse(r#"{"msg_op":"delete","msg_type":"lead"}"#).unwrap();
        assert_eq!(odd.op(), None);
        assert_eq!(odd.kind(), None);
        assert!(odd.event.is_null());
    }
}
