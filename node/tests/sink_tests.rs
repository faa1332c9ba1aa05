// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use common::read_lines;
use lightcall_node::errors::SinkError;
use lightcall_node::sink::{AppendSink, AppendStatus};
use tempfile::tempdir;

#[tokio::test]
async fn test_stalled_writer_keeps_exactly_capacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("activity.log");
    let (sink, worker) = AppendSink::open("activity", &path, 100).await.unwrap();

    let statuses: Vec<_> = (0..105).map(|i| sink.append(format!("line-{i}"))).collect();
    assert_eq!(statuses.iter().filter(|s| **s == AppendStatus::Queued).count(), 100);
    assert!(statuses[100..].iter().all(|s| *s == AppendStatus::DroppedFull));

    sink.run(worker).unwrap();
    sink.close().await.unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 100);
    assert_eq!(lines.first().map(String::as_str), Some("line-0"));
    assert_eq!(lines.last().map(String::as_str), Some("line-99"));
}

#[tokio::test]
async fn test_close_drains_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("change.log");
    let sink = AppendSink::start("change", &path, 100).await.unwrap();

    for i in 0..50 {
        assert_eq!(sink.append(format!("{{\"n\":{i}}}")), AppendStatus::Queued);
    }
    sink.close().await.unwrap();

    let expected: Vec<String> = (0..50).map(|i| format!("{{\"n\":{i}}}")).collect();
    assert_eq!(read_lines(&path), expected);
}

#[tokio::test]
async fn test_append_after_close_is_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("activity.log");
    let sink = AppendSink::start("activity", &path, 4).await.unwrap();
    sink.append("kept");
    sink.close().await.unwrap();

    assert_eq!(sink.append("late"), AppendStatus::DroppedClosing);
    assert_eq!(read_lines(&path), vec!["kept".to_string()]);
    // Closing twice is harmless.
    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_existing_content_is_preserved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("activity.log");
    std::fs::write(&path, "earlier\n").unwrap();

    let sink = AppendSink::start("activity", &path, 8).await.unwrap();
    sink.append("later");
    sink.close().await.unwrap();

    assert_eq!(read_lines(&path), vec!["earlier".to_string(), "later".to_string()]);
}

#[tokio::test]
async fn test_missing_directory_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("activity.log");

    let err = AppendSink::start("activity", &path, 8).await.err().unwrap();
    assert!(matches!(err, SinkError::Io(_)));
}

#[tokio::test]
async fn test_second_worker_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("activity.log");
    let sink = AppendSink::start("activity", &path, 8).await.unwrap();
    let (_, spare) = AppendSink::open("spare", dir.path().join("spare.log"), 8).await.unwrap();

    assert!(matches!(sink.run(spare), Err(SinkError::WorkerAttached(_))));
    sink.close().await.unwrap();
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_failed_write_does_not_stop_worker() {
    let sink = AppendSink::start("activity", "/dev/full", 8).await.unwrap();

    assert_eq!(sink.append("first"), AppendStatus::Queued);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // The worker dropped "first" and is still taking lines.
    assert_eq!(sink.append("second"), AppendStatus::Queued);
    assert_eq!(sink.append("third"), AppendStatus::Queued);

    // Syncing a character device may fail; close must still return.
    let _ = sink.close().await;
    assert_eq!(sink.append("late"), AppendStatus::DroppedClosing);
}
