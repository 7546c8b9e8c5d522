// src/exec/runner.rs

//! Single child-process runner.
//!
//! `start` spawns one [`ScheduledUnit`] as a child process and forwards its
//! stdout/stderr as line-oriented [`ProcessEvent`]s, followed by exactly one
//! `Exited` event once the process is gone. Cancellation is requested through
//! the returned [`ProcessHandle`] and is idempotent; the exit itself is only
//! authoritative via the completion event.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::sched::unit::ScheduledUnit;

/// How long a cancelled run may keep the output pipes open before the
/// readers are abandoned. Only descendants that survived the kill can
/// hold them that long.
const CANCEL_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// The OS could not create the process at all (missing shell, bad working
/// directory, permission denied). Distinct from a process that started and
/// exited non-zero.
#[derive(Debug, Error)]
#[error("failed to spawn process: {source}")]
pub struct SpawnError {
    #[from]
    source: std::io::Error,
}

/// Which stream a line of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOrigin {
    Stdout,
    Stderr,
}

/// One line of child-process output, tagged by origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub origin: OutputOrigin,
    pub text: String,
}

/// End state of a process, reported exactly once per started handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Process ran to completion; carries its exit code. A non-zero code is
    /// ordinary completion data, not a scheduler-level error.
    ExitedNormally(i32),
    /// Process was terminated by a signal we did not send.
    ExitedViaSignal,
    /// Process ended because cancellation was requested through its handle.
    Cancelled,
    /// The process never started; carries the spawn error text. Emitted by
    /// the scheduler when [`start`] fails, so observers see one uniform
    /// completion feed.
    SpawnFailed(String),
}

/// Event emitted by a running process.
///
/// `run` is the correlation token the caller passed to [`start`]; consumers
/// that interleave multiple sequential processes on one channel use it to
/// drop stale events from a process that is no longer current.
#[derive(Debug, Clone)]
pub struct ProcessEvent {
    pub run: u64,
    pub payload: ProcessPayload,
}

#[derive(Debug, Clone)]
pub enum ProcessPayload {
    Output(OutputLine),
    Exited(Outcome),
}

/// Handle to one live child process.
pub struct ProcessHandle {
    cancel_tx: watch::Sender<bool>,
    pid: Option<u32>,
}

impl ProcessHandle {
    /// Request termination of the process. Idempotent: repeated calls, or a
    /// call after the process has already exited, do nothing. The process is
    /// only actually gone once its `Exited` event arrives.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// OS process id, if the process was still alive when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Spawn a scheduled unit as a child process.
///
/// Output lines and the final `Exited` event are sent over `events_tx`,
/// tagged with `run`. The completion event is sent only after both output
/// readers have drained, so no line ever arrives after it.
pub fn start(
    unit: &ScheduledUnit,
    run: u64,
    events_tx: mpsc::Sender<ProcessEvent>,
) -> Result<ProcessHandle, SpawnError> {
    info!(run, kind = %unit.kind, cmd = %unit.command, "starting process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&unit.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&unit.command);
        c
    };

    if let Some(dir) = &unit.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Make the child lead its own process group so cancellation reaches
    // everything the shell forks, not just the shell itself.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    let pid = child.id();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_reader = stdout.map(|s| {
        spawn_line_reader(s, OutputOrigin::Stdout, run, events_tx.clone())
    });
    let stderr_reader = stderr.map(|s| {
        spawn_line_reader(s, OutputOrigin::Stderr, run, events_tx.clone())
    });

    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut was_cancelled = false;

        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => match status.code() {
                    Some(code) => Outcome::ExitedNormally(code),
                    None => Outcome::ExitedViaSignal,
                },
                Err(err) => {
                    warn!(run, error = %err, "waiting on child process failed");
                    Outcome::ExitedViaSignal
                }
            },
            _ = cancel_requested(cancel_rx) => {
                was_cancelled = true;
                kill_process_tree(&mut child, run);
                // The slot stays occupied until the process is really gone,
                // however long that takes.
                if let Err(err) = child.wait().await {
                    warn!(run, error = %err, "waiting on cancelled child failed");
                }
                Outcome::Cancelled
            }
        };

        // Let the readers reach EOF before signalling completion, so the
        // completion event is always the last one for this run. After a
        // cancellation the wait is bounded: a descendant that escaped the
        // kill must not stall the completion signal by keeping the pipe
        // write ends open.
        for mut reader in [stdout_reader, stderr_reader].into_iter().flatten() {
            if was_cancelled {
                if tokio::time::timeout(CANCEL_DRAIN_GRACE, &mut reader)
                    .await
                    .is_err()
                {
                    warn!(run, "output reader still open after cancel, abandoning it");
                    reader.abort();
                }
            } else {
                let _ = reader.await;
            }
        }

        info!(run, cancelled = was_cancelled, ?outcome, "process finished");

        let _ = events_tx
            .send(ProcessEvent {
                run,
                payload: ProcessPayload::Exited(outcome),
            })
            .await;
    });

    Ok(ProcessHandle { cancel_tx, pid })
}

/// Resolve once cancellation is requested; never resolve if the handle is
/// dropped without a request.
async fn cancel_requested(mut cancel_rx: watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            // Handle dropped without cancelling; wait for the process exit
            // branch instead.
            std::future::pending::<()>().await;
        }
    }
}

/// Forcibly terminate a cancelled child and everything it forked.
///
/// The child was spawned as its own process-group leader, so on Unix the
/// whole group is signalled; killing only the shell would orphan the
/// actual analyzer process and leave it running.
#[cfg(unix)]
fn kill_process_tree(child: &mut Child, run: u64) {
    if let Some(pid) = child.id() {
        // Negative pid addresses the process group.
        let rc = unsafe { libc::kill(-(pid as i32), libc::SIGKILL) };
        if rc != 0 {
            // Usually means the group is already gone; the wait that
            // follows still observes the exit.
            debug!(run, "kill after cancel request found no process group");
        }
        return;
    }
    if let Err(err) = child.start_kill() {
        debug!(run, error = %err, "kill after cancel request failed");
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child, run: u64) {
    if let Err(err) = child.start_kill() {
        debug!(run, error = %err, "kill after cancel request failed");
    }
}

fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    origin: OutputOrigin,
    run: u64,
    events_tx: mpsc::Sender<ProcessEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Ok(Some(text)) = lines.next_line().await {
            let event = ProcessEvent {
                run,
                payload: ProcessPayload::Output(OutputLine { origin, text }),
            };
            if events_tx.send(event).await.is_err() {
                // Receiver gone; no point draining further.
                break;
            }
        }
    })
}
