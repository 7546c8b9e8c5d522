// src/sched/scheduler.rs

//! The queue driver.
//!
//! An actor task owns the [`ExecutionQueue`] plus the handle of the active
//! process. Whenever the active slot is free and pending work exists, it pops
//! the next unit, starts it through [`crate::exec::runner`], and waits for the
//! completion event before draining again. Commands (`submit`, `stop`,
//! `shutdown`) arrive over an mpsc channel and return as soon as they are
//! enqueued, so submitters never block on process execution.
//!
//! Because a single task owns all queue state, every mutation is serialized
//! for free: two near-simultaneous submissions can never race a start, and
//! `take_next` is atomic with respect to `mark_active`.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::exec::runner::{self, Outcome, OutputLine, ProcessEvent, ProcessHandle, ProcessPayload};
use crate::sched::queue::ExecutionQueue;
use crate::sched::unit::{EnqueuePolicy, ProcessKind, ScheduledUnit};

/// Commands accepted by the scheduler actor.
#[derive(Debug)]
enum SchedulerCommand {
    Submit {
        unit: ScheduledUnit,
        policy: EnqueuePolicy,
    },
    Stop {
        kind: ProcessKind,
    },
    Shutdown,
}

/// Events emitted outward for presentation layers (status views, output
/// panels). Consumers subscribe to the channel passed to [`spawn_scheduler`]
/// and never touch scheduler internals.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A unit was promoted from pending to active and its process started.
    UnitStarted {
        kind: ProcessKind,
        command: String,
    },
    /// One line of output from the active process.
    Output {
        kind: ProcessKind,
        line: OutputLine,
    },
    /// The active unit finished, in whichever way. `SpawnFailed` outcomes
    /// arrive here too: the unit never became active but its fate is part of
    /// the same feed.
    UnitFinished {
        kind: ProcessKind,
        command: String,
        outcome: Outcome,
    },
    /// Snapshot of queue occupancy after any mutation.
    QueueChanged {
        pending: usize,
        active: bool,
    },
}

/// Cloneable handle used to talk to the scheduler actor.
///
/// All methods enqueue a command and return; none of them waits for the
/// corresponding process activity.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    cmd_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Submit a unit for execution under the given insertion policy.
    pub async fn submit(&self, unit: ScheduledUnit, policy: EnqueuePolicy) -> Result<()> {
        self.cmd_tx
            .send(SchedulerCommand::Submit { unit, policy })
            .await
            .context("scheduler is no longer running")
    }

    /// Remove every pending unit of the given kind and request cancellation
    /// of the active process if its kind matches.
    pub async fn stop(&self, kind: ProcessKind) -> Result<()> {
        self.cmd_tx
            .send(SchedulerCommand::Stop { kind })
            .await
            .context("scheduler is no longer running")
    }

    /// Discard all pending work, cancel the active process, and let the
    /// scheduler exit once the final completion has been observed.
    pub async fn shutdown(&self) -> Result<()> {
        self.cmd_tx
            .send(SchedulerCommand::Shutdown)
            .await
            .context("scheduler is no longer running")
    }
}

/// Spawn the scheduler actor. Outward events are sent on `events_tx`.
pub fn spawn_scheduler(events_tx: mpsc::Sender<SchedulerEvent>) -> SchedulerHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SchedulerCommand>(64);
    let (proc_tx, proc_rx) = mpsc::channel::<ProcessEvent>(256);

    let driver = Driver {
        queue: ExecutionQueue::new(),
        active: None,
        next_run: 0,
        shutting_down: false,
        cmd_rx,
        proc_rx,
        proc_tx,
        events_tx,
    };

    tokio::spawn(driver.run());

    SchedulerHandle { cmd_tx }
}

/// The active process as the driver sees it: the cancellation handle plus
/// the correlation id its events carry. The unit itself lives in the queue's
/// active slot.
struct ActiveProcess {
    handle: ProcessHandle,
    run: u64,
}

struct Driver {
    queue: ExecutionQueue,
    active: Option<ActiveProcess>,
    next_run: u64,
    shutting_down: bool,

    cmd_rx: mpsc::Receiver<SchedulerCommand>,
    proc_rx: mpsc::Receiver<ProcessEvent>,
    /// Handed to each started process; kept here so `proc_rx` never closes.
    proc_tx: mpsc::Sender<ProcessEvent>,

    events_tx: mpsc::Sender<SchedulerEvent>,
}

impl Driver {
    async fn run(mut self) {
        info!("scheduler started");

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::Submit { unit, policy }) => {
                            self.handle_submit(unit, policy).await;
                        }
                        Some(SchedulerCommand::Stop { kind }) => {
                            self.handle_stop(kind).await;
                        }
                        // A dropped handle counts as a shutdown request.
                        Some(SchedulerCommand::Shutdown) | None => break,
                    }
                }
                Some(event) = self.proc_rx.recv() => {
                    self.handle_process_event(event).await;
                }
            }
        }

        // Discard pending work, cancel the active process, and wait for its
        // completion before exiting so the child is reaped.
        self.begin_shutdown();
        while self.active.is_some() {
            match self.proc_rx.recv().await {
                Some(event) => self.handle_process_event(event).await,
                None => break,
            }
        }

        info!("scheduler exiting");
    }

    async fn handle_submit(&mut self, unit: ScheduledUnit, policy: EnqueuePolicy) {
        let discarded = self.queue.enqueue(unit, policy);
        if discarded > 0 {
            info!(discarded, "replaced pending queue");
        }
        self.drain().await;
        self.emit_queue_changed().await;
    }

    async fn handle_stop(&mut self, kind: ProcessKind) {
        let removed = self.queue.clear_by_kind(kind);
        info!(%kind, removed, "stop requested");

        if self.queue.active_kind() == Some(kind) {
            if let Some(active) = &self.active {
                active.handle.cancel();
            }
        }
        self.emit_queue_changed().await;
    }

    fn begin_shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        let discarded = self.queue.clear_all();
        info!(discarded, "scheduler shutting down");

        if let Some(active) = &self.active {
            active.handle.cancel();
        }
    }

    /// Apply one event from the running process.
    async fn handle_process_event(&mut self, event: ProcessEvent) {
        let current_run = match &self.active {
            Some(active) => active.run,
            None => {
                debug!(run = event.run, "event from finished process dropped");
                return;
            }
        };
        if event.run != current_run {
            debug!(run = event.run, current_run, "stale process event dropped");
            return;
        }

        match event.payload {
            ProcessPayload::Output(line) => {
                if let Some(kind) = self.queue.active_kind() {
                    let _ = self
                        .events_tx
                        .send(SchedulerEvent::Output { kind, line })
                        .await;
                }
            }
            ProcessPayload::Exited(outcome) => {
                self.active = None;
                if let Some(unit) = self.queue.clear_active() {
                    debug!(kind = %unit.kind, ?outcome, "active unit finished");
                    let _ = self
                        .events_tx
                        .send(SchedulerEvent::UnitFinished {
                            kind: unit.kind,
                            command: unit.command,
                            outcome,
                        })
                        .await;
                } else {
                    warn!("completion event with empty active slot");
                }

                self.drain().await;
                self.emit_queue_changed().await;
            }
        }
    }

    /// Promote pending units while the active slot is free. Spawn failures
    /// free the slot like any other completion, so draining moves on to the
    /// next pending unit.
    async fn drain(&mut self) {
        if self.shutting_down {
            return;
        }

        while let Some(unit) = self.queue.take_next() {
            let run = self.next_run;
            self.next_run += 1;

            match runner::start(&unit, run, self.proc_tx.clone()) {
                Ok(handle) => {
                    debug!(run, pid = ?handle.pid(), kind = %unit.kind, "process active");
                    let _ = self
                        .events_tx
                        .send(SchedulerEvent::UnitStarted {
                            kind: unit.kind,
                            command: unit.command.clone(),
                        })
                        .await;
                    self.queue.mark_active(unit);
                    self.active = Some(ActiveProcess { handle, run });
                    break;
                }
                Err(err) => {
                    warn!(kind = %unit.kind, cmd = %unit.command, error = %err, "spawn failed");
                    let _ = self
                        .events_tx
                        .send(SchedulerEvent::UnitFinished {
                            kind: unit.kind,
                            command: unit.command,
                            outcome: Outcome::SpawnFailed(err.to_string()),
                        })
                        .await;
                }
            }
        }
    }

    async fn emit_queue_changed(&self) {
        let _ = self
            .events_tx
            .send(SchedulerEvent::QueueChanged {
                pending: self.queue.pending_len(),
                active: self.queue.active().is_some(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::runner::OutputOrigin;

    fn stdout_line(text: &str) -> OutputLine {
        OutputLine {
            origin: OutputOrigin::Stdout,
            text: text.to_string(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_from_a_superseded_run_is_dropped() {
        let (_cmd_tx, cmd_rx) = mpsc::channel::<SchedulerCommand>(8);
        let (proc_tx, proc_rx) = mpsc::channel::<ProcessEvent>(8);
        let (events_tx, mut events_rx) = mpsc::channel::<SchedulerEvent>(8);

        // A real process backs the active handle; its own events go to a
        // channel this test never reads.
        let unit = ScheduledUnit::new("sleep 5", ProcessKind::Analyze);
        let (spawn_tx, _spawn_rx) = mpsc::channel::<ProcessEvent>(8);
        let handle = runner::start(&unit, 1, spawn_tx).unwrap();

        let mut driver = Driver {
            queue: ExecutionQueue::new(),
            active: None,
            next_run: 2,
            shutting_down: false,
            cmd_rx,
            proc_rx,
            proc_tx,
            events_tx,
        };
        driver.queue.mark_active(unit);
        driver.active = Some(ActiveProcess { handle, run: 1 });

        // A line from a run that is no longer current must not reach the
        // outward feed.
        driver
            .handle_process_event(ProcessEvent {
                run: 0,
                payload: ProcessPayload::Output(stdout_line("line from an earlier run")),
            })
            .await;
        assert!(events_rx.try_recv().is_err());

        // The current run's output still flows through.
        driver
            .handle_process_event(ProcessEvent {
                run: 1,
                payload: ProcessPayload::Output(stdout_line("current line")),
            })
            .await;
        match events_rx.try_recv() {
            Ok(SchedulerEvent::Output { line, .. }) => assert_eq!(line.text, "current line"),
            other => panic!("expected the current run's output, got {other:?}"),
        }

        if let Some(active) = &driver.active {
            active.handle.cancel();
        }
    }
}
