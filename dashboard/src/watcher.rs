//! Project file watching with a settle window.
//!
//! ```text
//! fs events → debouncer (settle) → filter → hub.files_changed → debounce → cycle
//! ```
//!
//! The debouncer only reports a path once writes to it have gone quiet for
//! the settle window. The hub then applies its own debounce across paths.
//!
//! The root itself is watched non-recursively and every top-level directory
//! that is not ignored is watched recursively, so `node_modules` and friends
//! never receive kernel watches. Top-level directories created later are
//! added as their create events settle.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{DebounceEventResult, Debouncer, FileIdMap, new_debouncer};

use crate::broadcast::HubHandle;
use crate::config::WatchConfig;
use crate::error::{DashboardError, Result};

type ProjectDebouncer = Debouncer<RecommendedWatcher, FileIdMap>;

/// Watches a project tree and forwards settled changes to the hub.
pub struct ProjectWatcher {
    root: PathBuf,

    /// Kept alive for the lifetime of the watch. The event handler holds a
    /// weak reference to add directories created after start.
    #[allow(dead_code)]
    debouncer: Arc<Mutex<Option<ProjectDebouncer>>>,
}

impl ProjectWatcher {
    pub fn start(root: &Path, config: &WatchConfig, hub: HubHandle) -> Result<Self> {
        let root = root.to_path_buf();
        let targets = watch_targets(&root, config)?;

        let shared: Arc<Mutex<Option<ProjectDebouncer>>> = Arc::new(Mutex::new(None));
        let handle = Arc::downgrade(&shared);
        let filter = config.clone();
        let handler_root = root.clone();

        let mut debouncer = new_debouncer(
            config.settle(),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let events: Vec<&Event> = events.iter().map(|event| &event.event).collect();
                    let created = new_top_level_dirs(&handler_root, events.iter().copied(), &filter);
                    if !created.is_empty() {
                        watch_created(&handle, &created);
                    }

                    let paths = relevant_paths(events.into_iter(), &filter);
                    if paths.is_empty() {
                        return;
                    }
                    tracing::debug!(count = paths.len(), "settled file changes");
                    if hub.files_changed(paths).is_err() {
                        tracing::debug!("hub closed, dropping file changes");
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::error!("Filesystem watcher error: {error:?}");
                    }
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|err| DashboardError::Watch {
                path: root.clone(),
                message: err.to_string(),
            })?;
        for dir in &targets {
            if let Err(err) = debouncer.watcher().watch(dir, RecursiveMode::Recursive) {
                tracing::warn!("failed to watch {}: {err}", dir.display());
            }
        }
        tracing::info!(root = %root.display(), dirs = targets.len(), "watching project");

        match shared.lock() {
            Ok(mut slot) => *slot = Some(debouncer),
            Err(_) => {
                return Err(DashboardError::Watch {
                    path: root,
                    message: "watcher state lock poisoned".to_string(),
                });
            }
        }
        Ok(Self {
            root,
            debouncer: shared,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Top-level directories of `root` that get a recursive watch.
fn watch_targets(root: &Path, config: &WatchConfig) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|source| DashboardError::DirectoryRead {
        path: root.to_path_buf(),
        source,
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .map(|entry| entry.path())
        .filter(|path| !is_ignored_below(root, path, config))
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn is_ignored_below(root: &Path, path: &Path, config: &WatchConfig) -> bool {
    match path.strip_prefix(root) {
        Ok(relative) => config.is_ignored(relative),
        Err(_) => true,
    }
}

/// Directories created directly under `root` that are not ignored.
fn new_top_level_dirs<'a>(
    root: &Path,
    events: impl Iterator<Item = &'a Event>,
    config: &WatchConfig,
) -> Vec<PathBuf> {
    let dirs: BTreeSet<PathBuf> = events
        .filter(|event| matches!(event.kind, EventKind::Create(_)))
        .flat_map(|event| event.paths.iter())
        .filter(|path| path.parent() == Some(root))
        .filter(|path| !is_ignored_below(root, path, config))
        .filter(|path| path.is_dir())
        .cloned()
        .collect();
    dirs.into_iter().collect()
}

fn watch_created(handle: &Weak<Mutex<Option<ProjectDebouncer>>>, dirs: &[PathBuf]) {
    let Some(shared) = handle.upgrade() else {
        return;
    };
    let Ok(mut slot) = shared.lock() else {
        tracing::warn!("watcher state lock poisoned");
        return;
    };
    let Some(debouncer) = slot.as_mut() else {
        return;
    };
    for dir in dirs {
        match debouncer.watcher().watch(dir, RecursiveMode::Recursive) {
            Ok(()) => tracing::debug!(dir = %dir.display(), "watching new directory"),
            Err(err) => tracing::warn!("failed to watch {}: {err}", dir.display()),
        }
    }
}

fn is_relevant_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Distinct changed paths outside ignored directories.
fn relevant_paths<'a>(events: impl Iterator<Item = &'a Event>, config: &WatchConfig) -> Vec<PathBuf> {
    let paths: BTreeSet<PathBuf> = events
        .filter(|event| is_relevant_event(event))
        .flat_map(|event| event.paths.iter())
        .filter(|path| !config.is_ignored(path))
        .cloned()
        .collect();
    paths.into_iter().collect()
}
