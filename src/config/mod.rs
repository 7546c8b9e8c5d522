// src/config/mod.rs

//! Settings and command-line resolution for tidywatch.
//!
//! Responsibilities:
//! - Define the TOML-backed settings model (`model.rs`).
//! - Load and validate a settings file from disk (`loader.rs`).
//! - Discover and inspect the compilation database (`database.rs`).
//! - Resolve user requests into runnable command lines (`resolve.rs`).

pub mod database;
pub mod loader;
pub mod model;
pub mod resolve;

pub use loader::{default_settings_path, load_and_validate, load_from_path, validate_settings};
pub use model::{AnalyzerSection, DatabaseSection, Settings, WatchSection};
pub use resolve::{analyze_unit, generate_unit, AnalysisTarget, ResolveError};
