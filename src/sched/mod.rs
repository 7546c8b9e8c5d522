// src/sched/mod.rs

//! The process execution scheduler.
//!
//! - [`unit`] defines the immutable description of one external-process
//!   invocation and the queue insertion policies.
//! - [`queue`] holds the ordered pending units plus the single active slot.
//! - [`scheduler`] is the driver: an actor loop that guarantees at most one
//!   process is ever executing, drains the queue on every completion, and
//!   re-emits process output and completion outcomes to observers.

pub mod queue;
pub mod scheduler;
pub mod unit;

pub use queue::ExecutionQueue;
pub use scheduler::{spawn_scheduler, SchedulerEvent, SchedulerHandle};
pub use unit::{EnqueuePolicy, ProcessKind, ScheduledUnit};
