// src/config/model.rs

use serde::Deserialize;

/// Top-level settings as read from a TOML file (`Tidywatch.toml`).
///
/// ```toml
/// [analyzer]
/// command = "clang-tidy"
/// args = ["--quiet"]
/// analyze_on_save = true
///
/// [database]
/// filename = "compile_commands.json"
/// search_paths = ["build", "."]
/// generate_command = "bear -- make"
///
/// [watch]
/// patterns = ["src/**/*.cpp", "include/**/*.hpp"]
/// exclude = ["build/**"]
/// ```
///
/// All sections are optional and have working defaults, so the tool runs
/// without any settings file at all.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    /// The external analyzer from `[analyzer]`.
    #[serde(default)]
    pub analyzer: AnalyzerSection,

    /// Compilation-database discovery from `[database]`.
    #[serde(default)]
    pub database: DatabaseSection,

    /// Source globs that trigger analyze-on-save, from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,
}

/// `[analyzer]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerSection {
    /// Analyzer executable or command prefix.
    #[serde(default = "default_analyzer_command")]
    pub command: String,

    /// Extra arguments placed before the `-p <database dir>` flag.
    #[serde(default)]
    pub args: Vec<String>,

    /// Whether saving a watched source file queues an analysis of it.
    #[serde(default = "default_true")]
    pub analyze_on_save: bool,
}

fn default_analyzer_command() -> String {
    "clang-tidy".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AnalyzerSection {
    fn default() -> Self {
        Self {
            command: default_analyzer_command(),
            args: Vec::new(),
            analyze_on_save: default_true(),
        }
    }
}

/// `[database]` section.
///
/// The compilation database is the configuration artifact everything hinges
/// on: without it no analyzer command line can be formed.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    /// File name of the compilation database.
    #[serde(default = "default_database_filename")]
    pub filename: String,

    /// Directories (relative to the project root) searched for the database,
    /// in order; the first hit wins.
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<String>,

    /// Command that (re)generates the database, e.g. a `bear -- make`
    /// wrapper. Optional; `tidywatch generate` fails without it.
    #[serde(default)]
    pub generate_command: Option<String>,
}

fn default_database_filename() -> String {
    "compile_commands.json".to_string()
}

fn default_search_paths() -> Vec<String> {
    vec!["build".to_string(), ".".to_string()]
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            filename: default_database_filename(),
            search_paths: default_search_paths(),
            generate_command: None,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Globs (relative to project root) for files whose saves trigger an
    /// analysis of that file.
    #[serde(default = "default_watch_patterns")]
    pub patterns: Vec<String>,

    /// Globs excluded from `patterns`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_watch_patterns() -> Vec<String> {
    ["**/*.c", "**/*.cc", "**/*.cpp", "**/*.cxx", "**/*.h", "**/*.hpp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            patterns: default_watch_patterns(),
            exclude: Vec::new(),
        }
    }
}
