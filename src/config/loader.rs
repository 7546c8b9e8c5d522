// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use globset::Glob;

use crate::config::model::Settings;

/// Load a settings file from a given path and return the raw `Settings`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] to also
/// run the sanity checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading settings file at {:?}", path))?;

    let settings: Settings = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML settings from {:?}", path))?;

    Ok(settings)
}

/// Load a settings file from path and run basic validation.
///
/// Checks:
/// - `[analyzer].command` is non-empty,
/// - `[database].filename` and `search_paths` are non-empty,
/// - every `[watch]` glob compiles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let settings = load_from_path(&path)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Sanity checks on a loaded (or default) `Settings`.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.analyzer.command.trim().is_empty() {
        return Err(anyhow!("[analyzer].command must not be empty"));
    }
    if settings.database.filename.trim().is_empty() {
        return Err(anyhow!("[database].filename must not be empty"));
    }
    if settings.database.search_paths.is_empty() {
        return Err(anyhow!("[database].search_paths must list at least one directory"));
    }

    for pat in settings.watch.patterns.iter().chain(settings.watch.exclude.iter()) {
        Glob::new(pat).with_context(|| format!("invalid [watch] glob pattern: {pat}"))?;
    }

    Ok(())
}

/// Default settings path: `Tidywatch.toml` in the current working directory.
/// Also used as the clap default for `--config`.
pub fn default_settings_path() -> &'static str {
    "Tidywatch.toml"
}
