// src/exec/mod.rs

//! Process execution layer.
//!
//! [`runner`] launches a single scheduled unit with
//! `tokio::process::Command`, streams its stdout/stderr as tagged line
//! events, and reports exactly one completion outcome per process. The
//! scheduler in [`crate::sched`] is its only in-crate caller, but it is
//! usable (and tested) on its own.

pub mod runner;

pub use runner::{
    Outcome, OutputLine, OutputOrigin, ProcessEvent, ProcessHandle, ProcessPayload, SpawnError,
};
