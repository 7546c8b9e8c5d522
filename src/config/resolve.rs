// src/config/resolve.rs

//! Command-line resolution.
//!
//! Turns a user-level request ("analyze these files", "analyze the project",
//! "generate the database") plus the current settings into a
//! [`ScheduledUnit`], or reports that the project is not configured. A
//! request that fails to resolve never reaches the queue.

use std::path::Path;

use thiserror::Error;

use crate::config::database;
use crate::config::model::Settings;
use crate::sched::unit::{ProcessKind, ScheduledUnit};

/// What an analysis run should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisTarget {
    /// A specific set of source files (the "current file" / "selected files"
    /// actions).
    Files(Vec<std::path::PathBuf>),
    /// Every file listed in the compilation database.
    Project,
}

/// The request could not be turned into a command line. Surfaced once to the
/// user as a warning; never retried automatically.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no compilation database found under the configured search paths")]
    DatabaseMissing,
    #[error("the compilation database lists no source files")]
    EmptyDatabase,
    #[error("no [database].generate_command configured")]
    NoGenerateCommand,
    #[error("reading compilation database: {0}")]
    Database(String),
}

/// Build the analyzer invocation for the given target.
///
/// The command line is `{command} {args...} -p <database dir> {files...}`,
/// run from the project root.
pub fn analyze_unit(
    settings: &Settings,
    root: &Path,
    db_path: Option<&Path>,
    target: &AnalysisTarget,
) -> Result<ScheduledUnit, ResolveError> {
    let db_path = db_path.ok_or(ResolveError::DatabaseMissing)?;
    let db_dir = db_path.parent().unwrap_or(root);

    let files = match target {
        AnalysisTarget::Files(files) => files.clone(),
        AnalysisTarget::Project => {
            let files = database::source_files(db_path)
                .map_err(|e| ResolveError::Database(e.to_string()))?;
            if files.is_empty() {
                return Err(ResolveError::EmptyDatabase);
            }
            files
        }
    };

    let mut command = String::new();
    command.push_str(&settings.analyzer.command);
    for arg in &settings.analyzer.args {
        command.push(' ');
        command.push_str(&shell_quote(arg));
    }
    command.push_str(" -p ");
    command.push_str(&shell_quote(&db_dir.to_string_lossy()));
    for file in &files {
        command.push(' ');
        command.push_str(&shell_quote(&file.to_string_lossy()));
    }

    Ok(ScheduledUnit::new(command, ProcessKind::Analyze).with_working_dir(root))
}

/// Build the compilation-database generation invocation.
pub fn generate_unit(settings: &Settings, root: &Path) -> Result<ScheduledUnit, ResolveError> {
    let command = settings
        .database
        .generate_command
        .as_deref()
        .ok_or(ResolveError::NoGenerateCommand)?;

    Ok(ScheduledUnit::new(command, ProcessKind::LogGeneration).with_working_dir(root))
}

/// Quote a single argument for the platform shell. Plain tokens pass
/// through untouched so common command lines stay readable.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=+:@%,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
