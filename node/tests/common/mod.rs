// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use lightcall_kernel::config::collections;
use lightcall_kernel::storage::Record;
use lightcall_kernel::MemoryStore;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const POLL: Duration = Duration::from_millis(20);

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_collections(&[
        collections::USERS,
        collections::TASK,
        collections::OBJECTIVE,
        collections::ACTIVITY,
    ]))
}

/// Record the ext id of every committed objective save, in order.
pub fn track_objective_saves(store: &MemoryStore) -> Arc<Mutex<Vec<String>>> {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = seen.clone();
    store.on_saved(Arc::new(move |_before: Option<&Record>, after: &Record| {
        if after.collection() == collections::OBJECTIVE {
            sink.lock().unwrap().push(after.get_str("ext_id").to_string());
        }
    }));
    seen
}

pub fn objective_line(ext_id: &str) -> String {
    format!(
        r#"{{"msg_op":"update","msg_type":"objective","event":{{"ext_id":"{ext_id}","title":"title {ext_id}","info":{{"company":"ACME","background":""}}}}}}"#
    )
}

pub fn append(path: &Path, text: &str) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Poll `cond` for up to five seconds.
pub async fn wait_for(cond: impl Fn() -> bool) -> bool {
    for _ in 0..500 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
