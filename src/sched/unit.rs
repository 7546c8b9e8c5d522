// src/sched/unit.rs

use std::path::PathBuf;

/// Category label on a scheduled unit.
///
/// Used only for selective bulk operations (`stop`, `clear_by_kind`);
/// it never influences queue ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    /// An analyzer invocation (single file, a file set, or the whole project).
    Analyze,
    /// A compilation-database generation run (build logging).
    LogGeneration,
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessKind::Analyze => write!(f, "analyze"),
            ProcessKind::LogGeneration => write!(f, "log-generation"),
        }
    }
}

/// Where a newly submitted unit lands in the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueuePolicy {
    /// Tail of the queue: runs after everything already pending.
    Append,
    /// Head of the queue: runs next, after the current active unit finishes,
    /// ahead of everything already queued. Used for interactive
    /// "analyze this file now" requests so they jump ahead of bulk work.
    Prepend,
    /// Discard every pending unit and make this the sole pending entry.
    /// Does not touch the active unit; callers that also want the active
    /// process gone issue a separate `stop` first.
    ReplaceAll,
}

/// One external command invocation awaiting or undergoing execution.
///
/// Immutable once constructed. Owned exclusively by whichever container
/// currently holds it (the pending queue or the active slot); ownership
/// transfers on dequeue, it is never duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledUnit {
    /// Fully-formed command line, run through the platform shell.
    pub command: String,
    /// Working directory for the process; inherits ours when `None`.
    pub working_dir: Option<PathBuf>,
    /// Category used for selective queue operations.
    pub kind: ProcessKind,
}

impl ScheduledUnit {
    pub fn new(command: impl Into<String>, kind: ProcessKind) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            kind,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}
