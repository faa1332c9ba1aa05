// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::errors::{NodeError, Result};
use lightcall_kernel::config::{DEFAULT_LEG_TTL, DEFAULT_SWEEP_INTERVAL};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_APPEND_QUEUE: usize = 100;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// CDR master file written by the switch.
    pub cdr_file: PathBuf,
    /// Directory holding call recordings named by the A-leg.
    pub record_dir: PathBuf,
    /// CDC stream written by the business system.
    pub cdc_file: PathBuf,
    pub activity_log_file: PathBuf,
    pub change_log_file: PathBuf,
    pub leg_ttl: Duration,
    pub sweep_interval: Duration,
    pub append_queue_capacity: usize,
    pub poll_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cdr_file: PathBuf::from("/cdr-csv/Master.csv"),
            record_dir: PathBuf::from("/record"),
            cdc_file: PathBuf::from("/cdc/cdc.log"),
            activity_log_file: PathBuf::from("/cdc/activity.log"),
            change_log_file: PathBuf::from("/cdc/change.log"),
            leg_ttl: DEFAULT_LEG_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            append_queue_capacity: DEFAULT_APPEND_QUEUE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `LIGHTCALL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            cdr_file: path_var("LIGHTCALL_CDR_FILE", defaults.cdr_file),
            record_dir: path_var("LIGHTCALL_RECORD_DIR", defaults.record_dir),
            cdc_file: path_var("LIGHTCALL_CDC_FILE", defaults.cdc_file),
            activity_log_file: path_var("LIGHTCALL_ACTIVITY_LOG", defaults.activity_log_file),
            change_log_file: path_var("LIGHTCALL_CHANGE_LOG", defaults.change_log_file),
            leg_ttl: parsed_var("LIGHTCALL_LEG_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.leg_ttl),
            sweep_interval: parsed_var("LIGHTCALL_SWEEP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            append_queue_capacity: parsed_var("LIGHTCALL_APPEND_QUEUE")?
                .unwrap_or(defaults.append_queue_capacity),
            poll_interval: parsed_var("LIGHTCALL_POLL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("cdr_file", &self.cdr_file),
            ("record_dir", &self.record_dir),
            ("cdc_file", &self.cdc_file),
            ("activity_log_file", &self.activity_log_file),
            ("change_log_file", &self.change_log_file),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(NodeError::Config(format!("{name} must not be empty")));
            }
        }

        if self.leg_ttl.is_zero() || self.sweep_interval.is_zero() || self.poll_interval.is_zero() {
            return Err(NodeError::Config("durations must be non-zero".to_string()));
        }
        if self.append_queue_capacity == 0 {
            return Err(NodeError::Config(
                "append_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn path_var(key: &str, default: PathBuf) -> PathBuf {
    env::var_os(key).map(PathBuf::from).unwrap_or(default)
}

fn parsed_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| NodeError::Config(format!("{key}={raw:?} is not a valid value"))),
        Err(_) => Ok(None),
    }
}
