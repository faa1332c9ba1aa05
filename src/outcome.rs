// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Call outcome derivation.
//!
//! A pure function of the matched legs. Nothing here touches the store.
//!
//! # Failure cause precedence
//! When the call did not connect the summary names exactly one cause, checked
//! in this order:
//! 1. the B-leg carries a SIP final code other than `200` (carrier error);
//! 2. the A-leg saw early media (provider answered, callee did not pick up);
//! 3. otherwise the call timed out after the A-leg's duration.

use crate::config::SIP_SUCCESS;
use crate::error::{KernelError, Result};
use crate::types::{LegRecord, MatchedPair};
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const START_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub caller: String,
    pub callee: String,
    pub provider_ok: bool,
    pub connect_ok: bool,
    pub start_epoch: i64,
    pub billmsec: i64,
    pub duration: i64,
    pub a_leg_cause: String,
    pub a_leg_sip_term: String,
    pub b_leg_cause: String,
    pub b_leg_sip_term: String,
}

impl CallOutcome {
    /// Derive the outcome of a matched pair, rejecting legs whose timing is inconsistent.
    pub fn from_legs(a_leg: &LegRecord, b_leg: &LegRecord) -> Result<Self> {
        a_leg.validate_timing()?;
        b_leg.validate_timing()?;
        if a_leg.start_epoch == 0 {
            return Err(KernelError::MalformedLeg {
                uuid: a_leg.uuid.clone(),
                reason: "missing start time".to_string(),
            });
        }

        Ok(Self {
            caller: a_leg.ori_caller.clone(),
            callee: a_leg.ori_callee.clone(),
            provider_ok: a_leg.progress_media_epoch != 0,
            connect_ok: a_leg.billmsec != 0,
            start_epoch: a_leg.start_epoch,
            billmsec: a_leg.billmsec,
            duration: a_leg.duration,
            a_leg_cause: a_leg.hangup_cause.clone(),
            a_leg_sip_term: a_leg.sip_term_status.clone(),
            b_leg_cause: b_leg.hangup_cause.clone(),
            b_leg_sip_term: b_leg.sip_term_status.clone(),
        })
    }

    pub fn from_pair(pair: &MatchedPair) -> Result<Self> {
        Self::from_legs(&pair.a_leg, &pair.b_leg)
    }

    /// Human summary with the start time rendered in the host's local zone.
    pub fn summary(&self) -> String {
        self.summary_in(&Local)
    }

    pub fn summary_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let start = tz
            .timestamp_opt(self.start_epoch, 0)
            .single()
            .map(|t| t.format(START_FORMAT).to_string())
            .unwrap_or_else(|| self.start_epoch.to_string());

        let mut out = format!("电话开始于 {start}");

        if self.connect_ok {
            let billsec = self.billmsec / 1000;
            out.push_str(&format!(", 通话时长 {} 分钟 {} 秒", billsec / 60, billsec % 60));
            return out;
        }

        out.push_str(", 未接通(");
        if !self.b_leg_sip_term.is_empty() && self.b_leg_sip_term != SIP_SUCCESS {
            out.push_str(&format!("线路商响应错误码 {} ", self.b_leg_sip_term));
        } else if self.provider_ok {
            out.push_str("客户未接听");
        } else {
            out.push_str(&format!("用时{}秒线路未接通", self.duration));
        }
        out.push(')');
        out
    }
}
