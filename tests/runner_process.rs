#![cfg(unix)]

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use tidywatch::exec::runner::{self, Outcome, OutputOrigin, ProcessEvent, ProcessPayload};
use tidywatch::sched::{ProcessKind, ScheduledUnit};

const WAIT: Duration = Duration::from_secs(10);

async fn next_event(rx: &mut mpsc::Receiver<ProcessEvent>) -> Option<ProcessEvent> {
    timeout(WAIT, rx.recv()).await.expect("timed out waiting for process event")
}

/// Collect every event up to and including the completion event.
async fn collect_run(mut rx: mpsc::Receiver<ProcessEvent>) -> (Vec<(OutputOrigin, String)>, Outcome) {
    let mut lines = Vec::new();
    loop {
        let event = next_event(&mut rx).await.expect("channel closed before completion");
        match event.payload {
            ProcessPayload::Output(line) => lines.push((line.origin, line.text)),
            ProcessPayload::Exited(outcome) => return (lines, outcome),
        }
    }
}

#[tokio::test]
async fn output_is_tagged_by_origin_and_completion_comes_last() {
    let (tx, rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("echo out; echo err 1>&2", ProcessKind::Analyze);
    let _handle = runner::start(&unit, 1, tx).unwrap();

    let (lines, outcome) = collect_run(rx).await;
    assert_eq!(outcome, Outcome::ExitedNormally(0));
    assert!(lines.contains(&(OutputOrigin::Stdout, "out".to_string())));
    assert!(lines.contains(&(OutputOrigin::Stderr, "err".to_string())));
}

#[tokio::test]
async fn nonzero_exit_is_ordinary_completion_data() {
    let (tx, rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("exit 3", ProcessKind::Analyze);
    let _handle = runner::start(&unit, 1, tx).unwrap();

    let (lines, outcome) = collect_run(rx).await;
    assert!(lines.is_empty());
    assert_eq!(outcome, Outcome::ExitedNormally(3));
}

#[tokio::test]
async fn working_dir_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().canonicalize().unwrap();

    let (tx, rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("pwd", ProcessKind::Analyze).with_working_dir(&expected);
    let _handle = runner::start(&unit, 1, tx).unwrap();

    let (lines, outcome) = collect_run(rx).await;
    assert_eq!(outcome, Outcome::ExitedNormally(0));
    assert_eq!(lines, vec![(OutputOrigin::Stdout, expected.to_string_lossy().into_owned())]);
}

#[tokio::test]
async fn spawn_failure_is_distinct_from_nonzero_exit() {
    let (tx, _rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("true", ProcessKind::Analyze)
        .with_working_dir("/definitely/not/a/directory");

    assert!(runner::start(&unit, 1, tx).is_err());
}

#[tokio::test]
async fn cancel_terminates_a_long_running_process() {
    let (tx, mut rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("sleep 30", ProcessKind::Analyze);
    let handle = runner::start(&unit, 1, tx).unwrap();

    handle.cancel();

    let event = next_event(&mut rx).await.unwrap();
    match event.payload {
        ProcessPayload::Exited(outcome) => assert_eq!(outcome, Outcome::Cancelled),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_terminates_processes_forked_by_the_shell() {
    // A pipeline makes the shell fork both sides instead of exec'ing a
    // single command. If cancellation only killed the shell, the sleeps
    // would survive as orphans holding the pipe write ends, and the
    // completion event would stall until they exited on their own.
    let (tx, mut rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("sleep 30 | sleep 30", ProcessKind::Analyze);
    let handle = runner::start(&unit, 1, tx).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();

    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("completion stalled after cancel")
        .unwrap();
    assert!(matches!(event.payload, ProcessPayload::Exited(Outcome::Cancelled)));
}

#[tokio::test]
async fn cancel_is_idempotent_and_fires_one_completion() {
    let (tx, mut rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("sleep 30", ProcessKind::Analyze);
    let handle = runner::start(&unit, 7, tx).unwrap();

    handle.cancel();
    handle.cancel();

    let event = next_event(&mut rx).await.unwrap();
    assert!(matches!(event.payload, ProcessPayload::Exited(Outcome::Cancelled)));
    assert_eq!(event.run, 7);

    // Cancelling after exit is a no-op and no second completion arrives.
    handle.cancel();
    drop(handle);
    assert!(next_event(&mut rx).await.is_none());
}

#[tokio::test]
async fn cancel_after_normal_exit_is_a_noop() {
    let (tx, mut rx) = mpsc::channel(64);
    let unit = ScheduledUnit::new("true", ProcessKind::Analyze);
    let handle = runner::start(&unit, 1, tx).unwrap();

    let event = next_event(&mut rx).await.unwrap();
    assert!(matches!(
        event.payload,
        ProcessPayload::Exited(Outcome::ExitedNormally(0))
    ));

    handle.cancel();
    drop(handle);
    assert!(next_event(&mut rx).await.is_none());
}
