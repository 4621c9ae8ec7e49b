//! Wires the file watcher to the broadcast hub for one project.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcast::{BroadcastHub, HubHandle};
use crate::config::{ConfigLoader, DashboardConfig};
use crate::error::{DashboardError, Result};
use crate::service::Dashboard;
use crate::watcher::ProjectWatcher;

/// Running dashboard: composers, hub task and watcher.
///
/// Must be started from within a Tokio runtime.
pub struct DashboardRuntime {
    root: PathBuf,
    dashboard: Arc<Dashboard>,
    hub: HubHandle,
    hub_task: JoinHandle<()>,
    watcher: Option<ProjectWatcher>,
    cancel: CancellationToken,
}

impl DashboardRuntime {
    pub fn start(root: impl AsRef<Path>, config: &DashboardConfig) -> Result<Self> {
        let root = root.as_ref();
        // Watch events carry canonical paths; feature lookup needs the same form.
        let root = root
            .canonicalize()
            .map_err(|source| DashboardError::DirectoryRead {
                path: root.to_path_buf(),
                source,
            })?;

        let dashboard = Arc::new(Dashboard::new(&root, config));
        let cancel = CancellationToken::new();
        let (hub, hub_task) = BroadcastHub::spawn(
            Arc::clone(&dashboard),
            config.watch.debounce(),
            cancel.child_token(),
        );

        let watcher = match ProjectWatcher::start(&root, &config.watch, hub.clone()) {
            Ok(watcher) => watcher,
            Err(err) => {
                cancel.cancel();
                return Err(err);
            }
        };
        tracing::info!(root = %root.display(), "dashboard runtime started");

        Ok(Self {
            root,
            dashboard,
            hub,
            hub_task,
            watcher: Some(watcher),
            cancel,
        })
    }

    /// Start with the layered configuration found for `root`.
    pub fn start_for_project(root: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::load_for_project(root.as_ref())?;
        Self::start(root, &config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Token cancelled when the runtime shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop watching, stop the hub and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.watcher.take();
        self.cancel.cancel();
        if let Err(err) = (&mut self.hub_task).await {
            tracing::warn!("broadcast hub ended abnormally: {err}");
        }
        tracing::info!(root = %self.root.display(), "dashboard runtime stopped");
    }
}

impl Drop for DashboardRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
