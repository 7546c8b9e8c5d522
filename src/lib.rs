// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sched;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{Action, CliArgs};
use crate::config::model::Settings;
use crate::config::resolve::AnalysisTarget;
use crate::engine::{Runtime, RuntimeEvent, RuntimeOptions};
use crate::sched::scheduler::SchedulerEvent;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading
/// - the process execution scheduler
/// - (in watch mode) the file watcher
/// - Ctrl-C handling
/// - the runtime event loop
pub async fn run(args: CliArgs) -> Result<()> {
    let settings_path = PathBuf::from(&args.config);
    let settings = if settings_path.is_file() {
        config::loader::load_and_validate(&settings_path)?
    } else {
        debug!(path = ?settings_path, "no settings file; using built-in defaults");
        Settings::default()
    };

    let root = project_root(&settings_path);
    let root = root.canonicalize().unwrap_or(root);

    let database = config::database::discover(&root, &settings.database);
    match &database {
        Some(path) => info!(path = ?path, "using compilation database"),
        None => warn!("no compilation database found yet"),
    }

    // Runtime event channel plus the scheduler's outward feed.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let (sched_ev_tx, sched_ev_rx) = mpsc::channel::<SchedulerEvent>(256);

    let scheduler = sched::spawn_scheduler(sched_ev_tx);

    // File watcher only in watch mode; one-shot actions exit when idle.
    let _watcher_handle = if matches!(args.action, Action::Watch) {
        let profile = watch::build_source_profile(&settings.watch)?;
        let candidates = config::database::candidate_paths(&root, &settings.database);
        Some(watch::spawn_watcher(
            root.clone(),
            profile,
            candidates,
            rt_tx.clone(),
        )?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Seed the initial request from the CLI action.
    match &args.action {
        Action::Analyze { files, project } => {
            let target = if *project {
                AnalysisTarget::Project
            } else {
                if files.is_empty() {
                    bail!("nothing to analyze: pass FILE arguments or --project");
                }
                AnalysisTarget::Files(files.clone())
            };
            rt_tx.send(RuntimeEvent::AnalyzeRequested { target }).await?;
        }
        Action::Generate => {
            rt_tx.send(RuntimeEvent::GenerateRequested).await?;
        }
        Action::Watch => {}
    }

    let options = RuntimeOptions {
        exit_when_idle: !matches!(args.action, Action::Watch),
    };

    let runtime = Runtime::new(
        settings, root, database, scheduler, options, rt_rx, sched_ev_rx,
    );
    runtime.run().await
}

/// Project root: the directory containing the settings file, or `.`.
fn project_root(settings_path: &Path) -> PathBuf {
    settings_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
