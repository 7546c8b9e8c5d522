// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `tidywatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tidywatch",
    version,
    about = "Run a static analyzer over files, the project, or on save, one process at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    ///
    /// Default: `Tidywatch.toml` in the current working directory. A missing
    /// file is fine; built-in defaults apply.
    #[arg(long, value_name = "PATH", default_value = crate::config::default_settings_path())]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TIDYWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub action: Action,
}

/// What to do.
#[derive(Debug, Clone, Subcommand)]
pub enum Action {
    /// Analyze the given source files, or the whole project, then exit.
    Analyze {
        /// Source files to analyze.
        #[arg(value_name = "FILE", conflicts_with = "project")]
        files: Vec<PathBuf>,

        /// Analyze every file listed in the compilation database.
        #[arg(long)]
        project: bool,
    },
    /// Run the configured database-generation command, then exit.
    Generate,
    /// Stay resident: watch source files and analyze them on save.
    Watch,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
