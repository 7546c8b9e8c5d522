// src/engine/mod.rs

//! Orchestration layer for tidywatch.
//!
//! The runtime event loop reacts to:
//! - user requests (analyze files / analyze project / generate database)
//! - file-watch triggers (source saves, database appearing/disappearing)
//! - the scheduler's output and completion feed
//! - shutdown signals
//!
//! and drives the process execution scheduler in [`crate::sched`].

pub mod runtime;

pub use runtime::{Runtime, RuntimeEvent, RuntimeOptions};
