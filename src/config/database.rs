// src/config/database.rs

//! Compilation-database discovery and inspection.
//!
//! The database (`compile_commands.json` by convention) is treated as an
//! opaque configuration artifact everywhere except here: this module finds
//! it under the configured search paths and, for whole-project runs, lists
//! the source files it covers. Nothing here talks to the scheduler.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::config::model::DatabaseSection;

/// One entry of a JSON compilation database, as emitted by CMake, bear and
/// friends. Either `command` or `arguments` is present; we need neither, but
/// accepting both keeps real-world databases parseable.
#[derive(Debug, Deserialize)]
struct CompileCommand {
    directory: String,
    file: String,
    #[serde(default)]
    #[allow(dead_code)]
    command: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    arguments: Option<Vec<String>>,
}

/// Every path where the database may appear, in search order. The watcher
/// observes these so its creation or deletion can be reported.
pub fn candidate_paths(root: &Path, section: &DatabaseSection) -> Vec<PathBuf> {
    section
        .search_paths
        .iter()
        .map(|dir| root.join(dir).join(&section.filename))
        .collect()
}

/// Find the compilation database under the configured search paths.
///
/// Returns the first candidate that exists, or `None` when the project is
/// not configured yet.
pub fn discover(root: &Path, section: &DatabaseSection) -> Option<PathBuf> {
    for candidate in candidate_paths(root, section) {
        if candidate.is_file() {
            debug!(path = ?candidate, "compilation database found");
            return Some(candidate);
        }
    }
    None
}

/// List the source files covered by the database, deduplicated, in entry
/// order. Relative entries are resolved against their `directory` field.
pub fn source_files(database: &Path) -> Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(database)
        .with_context(|| format!("reading compilation database at {:?}", database))?;

    let entries: Vec<CompileCommand> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing compilation database at {:?}", database))?;

    let mut files = Vec::new();
    for entry in &entries {
        let file = PathBuf::from(&entry.file);
        let file = if file.is_absolute() {
            file
        } else {
            PathBuf::from(&entry.directory).join(file)
        };
        if !files.contains(&file) {
            files.push(file);
        }
    }

    debug!(count = files.len(), "source files listed from compilation database");
    Ok(files)
}
