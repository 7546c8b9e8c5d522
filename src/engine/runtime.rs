// src/engine/runtime.rs

use std::path::PathBuf;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::model::Settings;
use crate::config::resolve::{self, AnalysisTarget, ResolveError};
use crate::exec::runner::{Outcome, OutputOrigin};
use crate::sched::scheduler::{SchedulerEvent, SchedulerHandle};
use crate::sched::unit::{EnqueuePolicy, ProcessKind};

/// Events sent into the runtime from the CLI, the file watcher, or signal
/// handling. The scheduler's own event feed arrives on a separate channel.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// User asked for an analysis run.
    AnalyzeRequested { target: AnalysisTarget },
    /// User asked to (re)generate the compilation database.
    GenerateRequested,
    /// User asked to stop analysis (pending and active).
    StopRequested,
    /// A watched source file was written.
    SourceSaved(PathBuf),
    /// A compilation-database candidate path was created or removed.
    DatabaseChanged { path: PathBuf, present: bool },
    /// Ctrl-C or equivalent.
    ShutdownRequested,
}

/// Options that influence how the runtime behaves.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// If true, exit as soon as the queue is empty and nothing is running.
    /// In watch mode this should be `false`.
    pub exit_when_idle: bool,
}

/// The outer event loop.
///
/// Responsibilities:
/// - Resolve user requests and save triggers into scheduled units and submit
///   them under the right insertion policy.
/// - Track where the compilation database currently lives.
/// - Consume the scheduler's event feed: forward process output to the
///   output surfaces and report completion outcomes.
///
/// It never touches queue internals; everything goes through the
/// [`SchedulerHandle`].
pub struct Runtime {
    settings: Settings,
    root: PathBuf,
    /// Where the compilation database was last seen, if anywhere.
    database: Option<PathBuf>,
    scheduler: SchedulerHandle,
    options: RuntimeOptions,

    events_rx: mpsc::Receiver<RuntimeEvent>,
    sched_rx: mpsc::Receiver<SchedulerEvent>,

    /// A missing database is reported once, then muted until it appears.
    warned_missing_database: bool,
    /// Set once any unit has started or finished. One-shot mode must not
    /// treat an idle snapshot emitted before the seeded request reached
    /// the queue (e.g. by the stop that precedes a project run) as "done".
    work_observed: bool,
}

impl Runtime {
    pub fn new(
        settings: Settings,
        root: PathBuf,
        database: Option<PathBuf>,
        scheduler: SchedulerHandle,
        options: RuntimeOptions,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        sched_rx: mpsc::Receiver<SchedulerEvent>,
    ) -> Self {
        Self {
            settings,
            root,
            database,
            scheduler,
            options,
            events_rx,
            sched_rx,
            warned_missing_database: false,
            work_observed: false,
        }
    }

    /// Main event loop. Returns once a shutdown is requested or, in one-shot
    /// mode, once the scheduler reports an idle queue.
    pub async fn run(mut self) -> Result<()> {
        info!("tidywatch runtime started");

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    debug!(?event, "runtime received event");
                    if !self.handle_runtime_event(event).await? {
                        break;
                    }
                }
                event = self.sched_rx.recv() => {
                    let Some(event) = event else { break };
                    if !self.handle_scheduler_event(event) {
                        break;
                    }
                }
            }
        }

        info!("tidywatch runtime exiting");
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    async fn handle_runtime_event(&mut self, event: RuntimeEvent) -> Result<bool> {
        match event {
            RuntimeEvent::AnalyzeRequested { target } => {
                self.handle_analyze_request(target).await?;
            }
            RuntimeEvent::GenerateRequested => {
                match resolve::generate_unit(&self.settings, &self.root) {
                    Ok(unit) => {
                        self.scheduler.submit(unit, EnqueuePolicy::Append).await?;
                    }
                    Err(err) => self.report_unresolved(err)?,
                }
            }
            RuntimeEvent::StopRequested => {
                self.scheduler.stop(ProcessKind::Analyze).await?;
            }
            RuntimeEvent::SourceSaved(path) => {
                self.handle_source_saved(path).await?;
            }
            RuntimeEvent::DatabaseChanged { path, present } => {
                if present {
                    info!(path = ?path, "compilation database appeared");
                    self.database = Some(path);
                    self.warned_missing_database = false;
                } else if self.database.as_deref() == Some(path.as_path()) {
                    warn!(path = ?path, "compilation database removed");
                    self.database = None;
                }
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested, stopping runtime");
                self.scheduler.shutdown().await?;
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn handle_analyze_request(&mut self, target: AnalysisTarget) -> Result<()> {
        // Resolve before touching the scheduler: a request that cannot be
        // formed must not cancel work that is already running.
        let unit =
            match resolve::analyze_unit(&self.settings, &self.root, self.database.as_deref(), &target)
            {
                Ok(unit) => unit,
                Err(err) => return self.report_unresolved(err),
            };

        // A fresh whole-project run supersedes prior partial ones: clear and
        // cancel analyze-tagged work first, then replace whatever is left.
        // Kept as two separate scheduler calls so replace-without-cancel
        // stays available to other callers.
        let policy = match target {
            AnalysisTarget::Project => {
                self.scheduler.stop(ProcessKind::Analyze).await?;
                EnqueuePolicy::ReplaceAll
            }
            AnalysisTarget::Files(_) => EnqueuePolicy::Prepend,
        };

        self.scheduler.submit(unit, policy).await?;
        Ok(())
    }

    async fn handle_source_saved(&mut self, path: PathBuf) -> Result<()> {
        if !self.settings.analyzer.analyze_on_save {
            debug!(path = ?path, "analyze_on_save disabled; ignoring save");
            return Ok(());
        }

        let target = AnalysisTarget::Files(vec![path]);
        match resolve::analyze_unit(&self.settings, &self.root, self.database.as_deref(), &target)
        {
            Ok(unit) => {
                self.scheduler.submit(unit, EnqueuePolicy::Append).await?;
            }
            Err(ResolveError::DatabaseMissing) => {
                if !self.warned_missing_database {
                    self.warned_missing_database = true;
                    warn!(
                        "no compilation database found; saves will not be analyzed until one appears"
                    );
                }
            }
            Err(err) => self.report_unresolved(err)?,
        }
        Ok(())
    }

    /// A request that never reached the queue. In one-shot mode this is
    /// fatal (there is nothing else to wait for); in watch mode it is a
    /// warning and the loop keeps going.
    fn report_unresolved(&self, err: ResolveError) -> Result<()> {
        if self.options.exit_when_idle {
            bail!(err);
        }
        warn!(error = %err, "request could not be resolved; nothing queued");
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    fn handle_scheduler_event(&mut self, event: SchedulerEvent) -> bool {
        match event {
            SchedulerEvent::UnitStarted { kind, command } => {
                self.work_observed = true;
                info!(%kind, cmd = %command, "run started");
            }
            SchedulerEvent::Output { line, .. } => match line.origin {
                OutputOrigin::Stdout => println!("{}", line.text),
                OutputOrigin::Stderr => eprintln!("{}", line.text),
            },
            SchedulerEvent::UnitFinished { kind, command, outcome } => {
                self.work_observed = true;
                match outcome {
                    Outcome::ExitedNormally(0) => {
                        info!(%kind, "run finished");
                    }
                    Outcome::ExitedNormally(code) => {
                        // Non-zero exit is the tool reporting findings or its
                        // own failure; not a scheduler-level error.
                        info!(%kind, exit_code = code, "run finished with non-zero exit");
                    }
                    Outcome::ExitedViaSignal => {
                        warn!(%kind, "run was terminated by a signal");
                    }
                    Outcome::Cancelled => {
                        info!(%kind, "run cancelled");
                    }
                    Outcome::SpawnFailed(msg) => {
                        error!(%kind, cmd = %command, error = %msg, "command could not be started");
                    }
                }
            }
            SchedulerEvent::QueueChanged { pending, active } => {
                debug!(pending, active, "queue changed");
                if self.options.exit_when_idle && self.work_observed && pending == 0 && !active {
                    info!("queue idle and exit_when_idle=true, stopping");
                    return false;
                }
            }
        }
        true
    }
}
