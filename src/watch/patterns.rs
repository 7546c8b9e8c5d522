// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::WatchSection;

/// Compiled include/exclude glob patterns for watched source files.
///
/// The patterns are relative to the project root; the watcher passes
/// relative paths (e.g. `"src/main.cpp"`) into `matches`.
#[derive(Clone)]
pub struct SourceWatchProfile {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for SourceWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceWatchProfile").finish_non_exhaustive()
    }
}

impl SourceWatchProfile {
    /// Returns true if a save of the given path (relative to the project
    /// root) should trigger an analysis of it.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile the `[watch]` section into a matchable profile.
pub fn build_source_profile(section: &WatchSection) -> Result<SourceWatchProfile> {
    let include = build_globset(&section.patterns)
        .context("building [watch].patterns globset")?;

    let exclude = if section.exclude.is_empty() {
        None
    } else {
        Some(build_globset(&section.exclude).context("building [watch].exclude globset")?)
    };

    Ok(SourceWatchProfile { include, exclude })
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
