// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Call leg records.
//!
//! The switch writes one JSON line per leg at teardown. A bridged call
//! produces two lines: the originating leg (no `originator`) and the answering
//! leg, whose `originator` carries the originating leg's `uuid`.

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};

/// Which side of a bridged call a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegRole {
    /// Originating side, empty peer id.
    A,
    /// Answering side, peer id set to the A-leg's id.
    B,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegRecord {
    pub uuid: String,
    pub originator: String,
    pub start_epoch: i64,
    pub answer_epoch: i64,
    pub progress_media_epoch: i64,
    pub end_epoch: i64,
    pub duration: i64,
    pub billmsec: i64,
    pub hangup_cause: String,
    pub sip_hangup_disposition: String,
    pub sip_term_status: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(rename = "activityId")]
    pub activity_id: String,
    #[serde(rename = "oriCaller")]
    pub ori_caller: String,
    #[serde(rename = "oriCallee")]
    pub ori_callee: String,
    #[serde(rename = "realCaller")]
    pub real_caller: String,
    #[serde(rename = "realCallee")]
    pub real_callee: String,
    pub record: String,
}

impl LegRecord {
    /// Decode one CDR line.
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn role(&self) -> LegRole {
        if self.originator.is_empty() {
            LegRole::A
        } else {
            LegRole::B
        }
    }

    /// Key shared by both legs of one call: own id for A, peer id for B.
    pub fn correlation_key(&self) -> &str {
        match self.role() {
            LegRole::A => &self.uuid,
            LegRole::B => &self.originator,
        }
    }

    /// Reject timing data that cannot describe a real call.
    pub fn validate_timing(&self) -> Result<()> {
        let malformed = |reason: &str| KernelError::MalformedLeg {
            uuid: self.uuid.clone(),
            reason: reason.to_string(),
        };

        if self.start_epoch < 0
            || self.answer_epoch < 0
            || self.progress_media_epoch < 0
            || self.end_epoch < 0
            || self.duration < 0
            || self.billmsec < 0
        {
            return Err(malformed("negative epoch or duration"));
        }
        if self.answer_epoch != 0 && self.answer_epoch < self.start_epoch {
            return Err(malformed("answered before start"));
        }
        if self.end_epoch != 0 && self.end_epoch < self.start_epoch {
            return Err(malformed("ended before start"));
        }
        Ok(())
    }
}

/// Both legs of one call, always ordered (A, B).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedPair {
    pub a_leg: LegRecord,
    pub b_leg: LegRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_originator() {
        let a = LegRecord {
            uuid: "a-1".into(),
            ..Default::default()
        };
        let b = LegRecord {
            uuid: "b-1".into(),
            originator: "a-1".into(),
            ..Default::default()
        };

        assert_eq!(a.role(), LegRole::A);
        assert_eq!(b.role(), LegRole::B);
        assert_eq!(a.correlation_key(), b.correlation_key());
    }

    #[test]
    fn test_parse_switch_line() {
        let line = r#"{"uuid":"u1","originator":"","start_epoch":1726204920,"billmsec":125000,"taskId":"t1","activityId":"act1","oriCaller":"1001","oriCallee":"13800000000","sip_term_status":"200"}"#;
        let leg = LegRecord::parse(line).unwrap();

        assert_eq!(leg.uuid, "u1");
        assert_eq!(leg.billmsec, 125000);
        assert_eq!(leg.task_id, "t1");
        assert_eq!(leg.activity_id, "act1");
        assert_eq!(leg.ori_callee, "13800000000");
        assert_eq!(leg.answer_epoch, 0);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            LegRecord::parse("not json"),
            Err(KernelError::Parse(_))
        ));
    }

    #[test]
    fn test_timing_validation() {
        let ok = LegRecord {
            uuid: "u".into(),
            start_epoch: 100,
            answer_epoch: 105,
            end_epoch: 160,
            ..Default::default()
        };
        assert!(ok.validate_timing().is_ok());

        let early_answer = LegRecord {
            answer_epoch: 99,
            ..ok.clone()
        };
        assert!(matches!(
            early_answer.validate_timing(),
            Err(KernelError::MalformedLeg { .. })
        ));

        let negative = LegRecord {
            duration: -1,
            ..ok
        };
        assert!(negative.validate_timing().is_err());
    }
}
