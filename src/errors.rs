// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! The app layer uses `anyhow` throughout; the typed errors the core can
//! produce are re-exported here so callers have one place to import from.

pub use anyhow::{Error, Result};

pub use crate::config::resolve::ResolveError;
pub use crate::exec::runner::SpawnError;
