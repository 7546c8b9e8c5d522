// src/sched/queue.rs

use std::collections::VecDeque;

use tracing::debug;

use crate::sched::unit::{EnqueuePolicy, ProcessKind, ScheduledUnit};

/// Ordered pending units plus the single active-unit slot.
///
/// Invariants:
/// - at most one unit is active at any time;
/// - a unit lives in exactly one of {pending, active}, never both;
/// - pending order is FIFO except for explicit `Prepend` / `ReplaceAll`.
///
/// The queue itself is a plain synchronous structure. It is owned by the
/// scheduler's actor task, so every mutation is applied atomically with
/// respect to every other one without a lock. `take_next` refusing to yield
/// while a unit is active is what keeps two processes from ever running
/// concurrently.
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    pending: VecDeque<ScheduledUnit>,
    active: Option<ScheduledUnit>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit under the given policy.
    ///
    /// Returns the number of pending units discarded (non-zero only for
    /// `ReplaceAll`). Discarded units are dropped outright; no completion
    /// event is ever observed for them.
    pub fn enqueue(&mut self, unit: ScheduledUnit, policy: EnqueuePolicy) -> usize {
        match policy {
            EnqueuePolicy::Append => {
                debug!(kind = %unit.kind, "queue: append");
                self.pending.push_back(unit);
                0
            }
            EnqueuePolicy::Prepend => {
                debug!(kind = %unit.kind, "queue: prepend");
                self.pending.push_front(unit);
                0
            }
            EnqueuePolicy::ReplaceAll => {
                let discarded = self.pending.len();
                debug!(kind = %unit.kind, discarded, "queue: replace all pending");
                self.pending.clear();
                self.pending.push_back(unit);
                discarded
            }
        }
    }

    /// Remove every pending unit of the given kind. The active unit is not
    /// touched; cancelling it is the scheduler's job. Returns the number of
    /// units removed (zero when nothing matched).
    pub fn clear_by_kind(&mut self, kind: ProcessKind) -> usize {
        let before = self.pending.len();
        self.pending.retain(|u| u.kind != kind);
        let removed = before - self.pending.len();
        if removed > 0 {
            debug!(%kind, removed, "queue: cleared pending units by kind");
        }
        removed
    }

    /// Discard every pending unit regardless of kind (shutdown path).
    pub fn clear_all(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    /// Remove and return the head of the pending queue, but only while no
    /// unit is active.
    pub fn take_next(&mut self) -> Option<ScheduledUnit> {
        if self.active.is_some() {
            return None;
        }
        self.pending.pop_front()
    }

    /// Move a unit into the active slot. Only the scheduler's drain step
    /// calls this, immediately after a successful `take_next` + spawn.
    pub fn mark_active(&mut self, unit: ScheduledUnit) {
        debug_assert!(self.active.is_none());
        self.active = Some(unit);
    }

    /// Free the active slot, returning the unit that occupied it.
    pub fn clear_active(&mut self) -> Option<ScheduledUnit> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&ScheduledUnit> {
        self.active.as_ref()
    }

    pub fn active_kind(&self) -> Option<ProcessKind> {
        self.active.as_ref().map(|u| u.kind)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending and nothing is active.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_none()
    }
}
