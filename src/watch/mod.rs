// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling the `[watch]` include/exclude glob patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning filesystem changes into runtime events: source saves and
//!   compilation-database appearance/disappearance.
//!
//! It does **not** know about the scheduler or its queue; the runtime decides
//! what a change means.

pub mod patterns;
pub mod watcher;

pub use patterns::{build_source_profile, SourceWatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
