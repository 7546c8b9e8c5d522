#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use tidywatch::config::{database, AnalysisTarget, Settings};
use tidywatch::engine::{Runtime, RuntimeEvent, RuntimeOptions};
use tidywatch::sched::{
    spawn_scheduler, EnqueuePolicy, ProcessKind, ScheduledUnit, SchedulerEvent,
};

const WAIT: Duration = Duration::from_secs(10);

fn write_database(root: &Path) {
    let entries = serde_json::json!([{
        "directory": root.to_string_lossy(),
        "file": "main.cc",
        "command": "c++ -c main.cc",
    }]);
    std::fs::write(root.join("compile_commands.json"), entries.to_string()).unwrap();
}

#[tokio::test]
async fn one_shot_project_analysis_runs_before_exiting() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write_database(&root);

    // Trailing `#` comments out the `-p <dir> <files>` suffix under sh, so
    // the "analyzer" is a plain sleep with a measurable duration.
    let mut settings = Settings::default();
    settings.analyzer.command = "sleep 0.3 #".to_string();

    let found = database::discover(&root, &settings.database);
    assert!(found.is_some());

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let (sched_ev_tx, sched_ev_rx) = mpsc::channel::<SchedulerEvent>(64);
    let scheduler = spawn_scheduler(sched_ev_tx);

    rt_tx
        .send(RuntimeEvent::AnalyzeRequested {
            target: AnalysisTarget::Project,
        })
        .await
        .unwrap();

    let runtime = Runtime::new(
        settings,
        root,
        found,
        scheduler,
        RuntimeOptions { exit_when_idle: true },
        rt_rx,
        sched_ev_rx,
    );

    // The stop that precedes a project run reports an idle queue before the
    // submit lands; the runtime must wait for the run itself, not exit on
    // that early snapshot.
    let started = Instant::now();
    timeout(WAIT, runtime.run()).await.unwrap().unwrap();
    assert!(
        started.elapsed() >= Duration::from_millis(250),
        "runtime exited before the project analysis ran"
    );

    drop(rt_tx);
}

#[tokio::test]
async fn unresolvable_project_request_leaves_running_work_alone() {
    // No compilation database anywhere, so a whole-project request cannot
    // be resolved. It must fail before touching the scheduler instead of
    // cancelling analyze work that is already running.
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let marker = root.join("finished");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let (sched_ev_tx, sched_ev_rx) = mpsc::channel::<SchedulerEvent>(64);
    let scheduler = spawn_scheduler(sched_ev_tx);

    let unit = ScheduledUnit::new(
        format!("sleep 0.2 && touch '{}'", marker.display()),
        ProcessKind::Analyze,
    );
    scheduler.submit(unit, EnqueuePolicy::Append).await.unwrap();

    let runtime = Runtime::new(
        Settings::default(),
        root,
        None,
        scheduler,
        RuntimeOptions { exit_when_idle: false },
        rt_rx,
        sched_ev_rx,
    );
    let running = tokio::spawn(runtime.run());

    rt_tx
        .send(RuntimeEvent::AnalyzeRequested {
            target: AnalysisTarget::Project,
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();

    assert!(
        marker.exists(),
        "a request that never resolved cancelled the running unit"
    );
}
