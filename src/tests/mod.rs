
use crate::config::collections;
use crate::storage::MemoryStore;
use crate::types::LegRecord;
use std::sync::Arc;

pub(crate) fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_collections(&[
        collections::USERS,
        collections::TASK,
        collections::OBJECTIVE,
        collections::ACTIVITY,
    ]))
}

pub(crate) fn a_leg(uuid: &str) -> LegRecord {
    LegRecord {
        uuid: uuid.to_string(),
        start_epoch: 1_726_204_920,
        ori_caller: "1001".to_string(),
        ori_callee: "13800000000".to_string(),
        ..Default::default()
    }
}

pub(crate) fn b_leg(uuid: &str, a_uuid: &str) -> LegRecord {
    LegRecord {
        uuid: uuid.to_string(),
        originator: a_uuid.to_string(),
        start_epoch: 1_726_204_921,
        ..Default::default()
    }
}
