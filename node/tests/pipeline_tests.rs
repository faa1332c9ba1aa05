// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use common::{append, memory_store, read_lines, wait_for, POLL};
use lightcall_kernel::clock::ManualClock;
use lightcall_kernel::storage::RecordStore;
use lightcall_kernel::{LegRecord, MemoryStore};
use lightcall_node::config::NodeConfig;
use lightcall_node::errors::{NodeError, SourceError};
use lightcall_node::Node;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn config(dir: &Path) -> NodeConfig {
    let record_dir = dir.join("record");
    std::fs::create_dir_all(&record_dir).unwrap();
    let cfg = NodeConfig {
        cdr_file: dir.join("Master.csv"),
        record_dir,
        cdc_file: dir.join("cdc.log"),
        activity_log_file: dir.join("activity.log"),
        change_log_file: dir.join("change.log"),
        poll_interval: POLL,
        ..Default::default()
    };
    std::fs::write(&cfg.cdr_file, "").unwrap();
    std::fs::write(&cfg.cdc_file, "").unwrap();
    cfg
}

async fn started() -> (TempDir, NodeConfig, Arc<MemoryStore>, Node) {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());
    let store = memory_store();
    let node = Node::start(cfg.clone(), store.clone()).await.unwrap();
    (dir, cfg, store, node)
}

fn leg_line(leg: &LegRecord) -> String {
    serde_json::to_string(leg).unwrap() + "\n"
}

#[tokio::test]
async fn test_cdc_then_call_end_to_end() {
    let (_dir, cfg, store, node) = started().await;

    append(
        &cfg.cdc_file,
        concat!(
            r#"{"msg_op":"create","msg_type":"objective","event":{"ext_id":"X","title":"Renewals","info":{"company":"ACME","background":""}}}"#,
            "\n",
            r#"{"msg_op":"create","msg_type":"task","event":{"objective_title":"Renewals","ext_id":"T1","own":"agent@example.com","contact":"Li","callee":"13800000000","desc":""}}"#,
            "\n"
        ),
    );
    assert!(wait_for(|| store.count("task") == 1).await);
    let task = store.find_record_by_external_id("task", "T1").unwrap().unwrap();

    // The dialer creates the activity before the call is placed.
    let mut activity = store.new_record("activity").unwrap();
    activity.set("comment", "dialing");
    store.save(&mut activity).unwrap();
    std::fs::write(cfg.record_dir.join("call-1.wav"), b"RIFF").unwrap();

    let a_leg = LegRecord {
        uuid: "call-1".into(),
        start_epoch: 1_726_204_920,
        answer_epoch: 1_726_204_925,
        progress_media_epoch: 1_726_204_922,
        end_epoch: 1_726_205_050,
        duration: 130,
        billmsec: 125_000,
        user_id: "user-1".into(),
        task_id: task.id().to_string(),
        activity_id: activity.id().to_string(),
        ori_caller: "1001".into(),
        ori_callee: "13800000000".into(),
        record: "call-1.wav".into(),
        ..Default::default()
    };
    let b_leg = LegRecord {
        uuid: "leg-b".into(),
        originator: "call-1".into(),
        start_epoch: 1_726_204_921,
        sip_term_status: "200".into(),
        ..Default::default()
    };

    // B-leg first: arrival order does not matter.
    append(&cfg.cdr_file, &leg_line(&b_leg));
    append(&cfg.cdr_file, &leg_line(&a_leg));

    let activity_id = activity.id().to_string();
    assert!(wait_for(|| {
        store
            .find_record_by_id("activity", &activity_id)
            .unwrap()
            .map(|r| r.get_bool("isCall"))
            .unwrap_or(false)
    })
    .await);
    assert_eq!(node.correlator().pending(), (0, 0));

    let saved = store.find_record_by_id("activity", &activity_id).unwrap().unwrap();
    assert!(saved.get_str("comment").ends_with("通话时长 2 分钟 5 秒"));
    assert!(saved.get_str("record").ends_with("call-1.wav"));
    let linked = store.find_record_by_id("task", task.id()).unwrap().unwrap();
    assert_eq!(linked.get_string_list("activity"), vec![activity_id.clone()]);

    node.shutdown().await.unwrap();

    let events: Vec<Value> = read_lines(&cfg.activity_log_file)
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["eventType"], "activity_created");
    assert_eq!(events[0]["taskExtId"], "T1");
    assert_eq!(events[0]["activityId"], activity_id.as_str());
    assert_eq!(events[0]["activityData"]["isCall"], true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_calls_right_after_start_are_audited() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());
    let store = memory_store();

    let mut task = store.new_record("task").unwrap();
    task.set("ext_id", "T7");
    store.save(&mut task).unwrap();
    let mut activity = store.new_record("activity").unwrap();
    store.save(&mut activity).unwrap();

    let node = Node::start(cfg.clone(), store.clone()).await.unwrap();
    let a_leg = LegRecord {
        uuid: "call-7".into(),
        start_epoch: 1_726_204_920,
        task_id: task.id().to_string(),
        activity_id: activity.id().to_string(),
        ..Default::default()
    };
    let b_leg = LegRecord {
        uuid: "leg-b7".into(),
        originator: "call-7".into(),
        start_epoch: 1_726_204_921,
        ..Default::default()
    };
    append(&cfg.cdr_file, &(leg_line(&a_leg) + &leg_line(&b_leg)));

    let task_id = task.id().to_string();
    assert!(wait_for(|| {
        store
            .find_record_by_id("task", &task_id)
            .unwrap()
            .map(|r| r.get_string_list("activity").len() == 1)
            .unwrap_or(false)
    })
    .await);
    node.shutdown().await.unwrap();

    let lines = read_lines(&cfg.activity_log_file);
    assert_eq!(lines.len(), 1);
    let event: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(event["taskExtId"], "T7");
    assert_eq!(event["activityId"], activity.id());
}

#[tokio::test]
async fn test_native_tasks_produce_no_activity_events() {
    let (_dir, cfg, store, node) = started().await;

    let mut task = store.new_record("task").unwrap();
    store.save(&mut task).unwrap();
    assert_eq!(task.get_str("ext_id"), task.id());

    let mut activity = store.new_record("activity").unwrap();
    store.save(&mut activity).unwrap();
    task.append_to_list("activity", activity.id());
    store.save(&mut task).unwrap();

    node.shutdown().await.unwrap();
    assert!(read_lines(&cfg.activity_log_file).is_empty());
}

#[tokio::test]
async fn test_user_close_request_is_logged() {
    let (_dir, cfg, store, node) = started().await;

    append(
        &cfg.cdc_file,
        concat!(
            r#"{"msg_op":"update","msg_type":"objective","event":{"ext_id":"X","title":"Renewals"}}"#,
            "\n"
        ),
    );
    assert!(wait_for(|| store.count("objective") == 1).await);

    let before = store.find_record_by_external_id("objective", "X").unwrap().unwrap();
    let mut after = before.clone();
    after.set("open", false);
    assert!(node.hooks().open_change_requested(&before, &after, "boss@example.com"));
    assert!(!node.hooks().open_change_requested(&before, &before, "boss@example.com"));

    node.shutdown().await.unwrap();

    let lines = read_lines(&cfg.change_log_file);
    assert_eq!(lines.len(), 1);
    let event: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(event["eventType"], "close_request");
    assert_eq!(event["ext_id"], "X");
    assert_eq!(event["entityType"], "objective");
}

#[tokio::test]
async fn test_sweeper_evicts_orphans() {
    let dir = tempdir().unwrap();
    let cfg = NodeConfig {
        leg_ttl: Duration::from_secs(60),
        sweep_interval: Duration::from_millis(20),
        ..config(dir.path())
    };
    let clock = Arc::new(ManualClock::new());
    let node = Node::start_with_clock(cfg.clone(), memory_store(), clock.clone())
        .await
        .unwrap();

    let orphan = LegRecord {
        uuid: "leg-b".into(),
        originator: "call-9".into(),
        ..Default::default()
    };
    append(&cfg.cdr_file, &leg_line(&orphan));
    assert!(wait_for(|| node.correlator().pending() == (0, 1)).await);

    clock.advance(Duration::from_secs(61));
    assert!(wait_for(|| node.correlator().pending() == (0, 0)).await);

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_input_file_is_fatal() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());
    std::fs::remove_file(&cfg.cdc_file).unwrap();

    let err = Node::start(cfg, memory_store()).await.err().unwrap();
    assert!(matches!(err, NodeError::Source(SourceError::MissingFile(_))));
}

#[tokio::test]
async fn test_invalid_config_is_fatal() {
    let dir = tempdir().unwrap();
    let cfg = NodeConfig {
        append_queue_capacity: 0,
        ..config(dir.path())
    };

    let err = Node::start(cfg, memory_store()).await.err().unwrap();
    assert!(matches!(err, NodeError::Config(_)));
}
