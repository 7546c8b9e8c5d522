// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::patterns::SourceWatchProfile;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher observing `root` recursively.
///
/// Two classes of paths are interesting:
/// - `database_candidates`: the places the compilation database may live;
///   their creation or removal is reported as
///   [`RuntimeEvent::DatabaseChanged`] so callers re-resolve configuration.
/// - source files matching `profile`: a write is reported as
///   [`RuntimeEvent::SourceSaved`] (the analyze-on-save trigger).
///
/// The watcher never talks to the scheduler directly.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profile: SourceWatchProfile,
    database_candidates: Vec<PathBuf>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone()); // best-effort

    let candidate_rels: Vec<String> = database_candidates
        .iter()
        .filter_map(|p| relative_str(&root, p))
        .collect();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        {
            let event_tx = event_tx.clone();
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // We can't log via tracing here easily, so fall back to stderr.
                        eprintln!("tidywatch: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("tidywatch: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    // Async task that consumes notify events and forwards runtime events.
    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!("received notify event: {:?}", event);

            for path in &event.paths {
                let Some(rel) = relative_str(&async_root, path) else {
                    continue;
                };

                let runtime_event = classify(&event.kind, path, &rel, &candidate_rels, &profile);
                let Some(runtime_event) = runtime_event else {
                    continue;
                };

                if let Err(err) = runtime_tx.send(runtime_event).await {
                    warn!("failed to forward watch event to runtime: {err}");
                    // Runtime channel closed; no point keeping the loop alive.
                    return;
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Map one notify event on one path to a runtime event, if any.
fn classify(
    kind: &EventKind,
    path: &Path,
    rel: &str,
    candidate_rels: &[String],
    profile: &SourceWatchProfile,
) -> Option<RuntimeEvent> {
    if candidate_rels.iter().any(|c| c == rel) {
        let present = match kind {
            EventKind::Create(_) => true,
            EventKind::Remove(_) => false,
            // Renames show up as Modify(Name) on some platforms.
            EventKind::Modify(ModifyKind::Name(_)) => path.exists(),
            _ => return None,
        };
        debug!(path = %rel, present, "compilation database changed");
        return Some(RuntimeEvent::DatabaseChanged {
            path: path.to_path_buf(),
            present,
        });
    }

    let written = matches!(kind, EventKind::Create(_) | EventKind::Modify(_));
    if written && profile.matches(rel) {
        debug!(path = %rel, "source save matched watch patterns");
        return Some(RuntimeEvent::SourceSaved(path.to_path_buf()));
    }

    None
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root` and cannot be relativized.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(s)
}
