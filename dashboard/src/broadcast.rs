//! Broadcast hub: owns the viewer table and the debounce timer.
//!
//! A single task handles every command, so a viewer's subscription snapshot
//! is always sent before any delta computed for it, and two changes inside
//! one debounce window produce exactly one recomputation.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{DashboardError, Result};
use crate::protocol::{ClientMessage, ServerMessage, parse_client_message};
use crate::service::Dashboard;

pub type ViewerId = u64;

/// A connected viewer: its id plus the stream of pushes addressed to it.
pub struct Viewer {
    pub id: ViewerId,
    pub messages: mpsc::UnboundedReceiver<Arc<ServerMessage>>,
}

#[derive(Debug)]
enum HubCommand {
    Connect { reply: oneshot::Sender<Viewer> },
    Subscribe { viewer: ViewerId, feature: String },
    ClientText { viewer: ViewerId, text: String },
    Disconnect { viewer: ViewerId },
    FilesChanged { paths: Vec<PathBuf> },
    Shutdown,
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer").field("id", &self.id).finish()
    }
}

/// Cloneable handle used by transports and the file watcher.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    cancel: CancellationToken,
}

impl HubHandle {
    fn send(&self, command: HubCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| DashboardError::HubClosed)
    }

    /// Register a viewer; it immediately receives the project-wide listings.
    pub async fn connect(&self) -> Result<Viewer> {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::Connect { reply })?;
        response.await.map_err(|_| DashboardError::HubClosed)
    }

    /// Point a viewer at one feature and push that feature's views.
    pub fn subscribe(&self, viewer: ViewerId, feature: impl Into<String>) -> Result<()> {
        self.send(HubCommand::Subscribe {
            viewer,
            feature: feature.into(),
        })
    }

    /// Raw text frame received from a viewer.
    pub fn client_text(&self, viewer: ViewerId, text: impl Into<String>) -> Result<()> {
        self.send(HubCommand::ClientText {
            viewer,
            text: text.into(),
        })
    }

    pub fn disconnect(&self, viewer: ViewerId) -> Result<()> {
        self.send(HubCommand::Disconnect { viewer })
    }

    /// Report settled file changes; restarts the debounce window.
    pub fn files_changed(&self, paths: Vec<PathBuf>) -> Result<()> {
        self.send(HubCommand::FilesChanged { paths })
    }

    pub fn shutdown(&self) {
        let _ = self.send(HubCommand::Shutdown);
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

struct ViewerSlot {
    sender: mpsc::UnboundedSender<Arc<ServerMessage>>,
    feature: Option<String>,
}

struct HubState {
    dashboard: Arc<Dashboard>,
    debounce: Duration,
    viewers: HashMap<ViewerId, ViewerSlot>,
    next_id: ViewerId,
    deadline: Option<Instant>,
    pending_paths: usize,
}

impl HubState {
    fn new(dashboard: Arc<Dashboard>, debounce: Duration) -> Self {
        Self {
            dashboard,
            debounce,
            viewers: HashMap::new(),
            next_id: 1,
            deadline: None,
            pending_paths: 0,
        }
    }

    /// Send to one viewer; `false` when its receiver is gone.
    fn deliver(&self, viewer: ViewerId, messages: &[Arc<ServerMessage>]) -> bool {
        let Some(slot) = self.viewers.get(&viewer) else {
            return false;
        };
        messages
            .iter()
            .all(|message| slot.sender.send(Arc::clone(message)).is_ok())
    }

    fn drop_viewers(&mut self, closed: Vec<ViewerId>) {
        for viewer in closed {
            if self.viewers.remove(&viewer).is_some() {
                debug!(viewer, "viewer channel closed, dropping");
            }
        }
    }

    fn connect(&mut self, reply: oneshot::Sender<Viewer>) {
        let id = self.next_id;
        self.next_id += 1;
        let (sender, messages) = mpsc::unbounded_channel();
        self.viewers.insert(
            id,
            ViewerSlot {
                sender,
                feature: None,
            },
        );
        if reply.send(Viewer { id, messages }).is_err() {
            self.viewers.remove(&id);
            return;
        }
        debug!(viewer = id, "viewer connected");

        let listings: Vec<Arc<ServerMessage>> = self
            .dashboard
            .project_updates()
            .into_iter()
            .map(Arc::new)
            .collect();
        if !self.deliver(id, &listings) {
            self.drop_viewers(vec![id]);
        }
    }

    async fn subscribe(&mut self, viewer: ViewerId, feature: String) {
        let Some(slot) = self.viewers.get_mut(&viewer) else {
            debug!(viewer, "subscribe from unknown viewer ignored");
            return;
        };
        slot.feature = Some(feature.clone());
        debug!(viewer, feature = %feature, "viewer subscribed");

        let snapshot: Vec<Arc<ServerMessage>> = self
            .dashboard
            .feature_updates(&feature)
            .await
            .into_iter()
            .map(Arc::new)
            .collect();
        if !self.deliver(viewer, &snapshot) {
            self.drop_viewers(vec![viewer]);
        }
    }

    async fn client_text(&mut self, viewer: ViewerId, text: &str) {
        if let Some(ClientMessage::Subscribe { feature }) = parse_client_message(text) {
            self.subscribe(viewer, feature).await;
        }
    }

    fn files_changed(&mut self, paths: &[PathBuf]) {
        let project = self.dashboard.project();
        for path in paths {
            if path.file_name().is_some_and(|name| name == "plan.md")
                && let Some(feature) = project.feature_for_path(path)
            {
                self.dashboard.invalidate_plan(&feature);
            }
        }
        self.pending_paths += paths.len();
        self.deadline = Some(Instant::now() + self.debounce);
    }

    /// Recompute everything once and push it.
    async fn run_cycle(&mut self) {
        self.deadline = None;
        let changed = std::mem::take(&mut self.pending_paths);
        debug!(changed, viewers = self.viewers.len(), "running broadcast cycle");

        let mut closed = Vec::new();
        let listings: Vec<Arc<ServerMessage>> = self
            .dashboard
            .project_updates()
            .into_iter()
            .map(Arc::new)
            .collect();
        for &viewer in self.viewers.keys() {
            if !self.deliver(viewer, &listings) {
                closed.push(viewer);
            }
        }
        self.drop_viewers(closed);

        let features: BTreeSet<String> = self
            .viewers
            .values()
            .filter_map(|slot| slot.feature.clone())
            .collect();
        let mut closed = Vec::new();
        for feature in features {
            let updates: Vec<Arc<ServerMessage>> = self
                .dashboard
                .feature_updates(&feature)
                .await
                .into_iter()
                .map(Arc::new)
                .collect();
            for (&viewer, slot) in &self.viewers {
                if slot.feature.as_deref() == Some(feature.as_str())
                    && !self.deliver(viewer, &updates)
                {
                    closed.push(viewer);
                }
            }
        }
        self.drop_viewers(closed);
    }
}

/// Spawns the hub task.
pub struct BroadcastHub;

impl BroadcastHub {
    pub fn spawn(
        dashboard: Arc<Dashboard>,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> (HubHandle, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let handle = HubHandle {
            commands,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(run_hub(
            HubState::new(dashboard, debounce),
            command_rx,
            cancel,
        ));
        (handle, task)
    }
}

async fn run_hub(
    mut state: HubState,
    mut command_rx: mpsc::UnboundedReceiver<HubCommand>,
    cancel: CancellationToken,
) {
    loop {
        let deadline = state.deadline;
        tokio::select! {
            () = cancel.cancelled() => break,
            command = command_rx.recv() => {
                match command {
                    Some(HubCommand::Connect { reply }) => state.connect(reply),
                    Some(HubCommand::Subscribe { viewer, feature }) => {
                        state.subscribe(viewer, feature).await;
                    }
                    Some(HubCommand::ClientText { viewer, text }) => {
                        state.client_text(viewer, &text).await;
                    }
                    Some(HubCommand::Disconnect { viewer }) => {
                        state.viewers.remove(&viewer);
                        debug!(viewer, "viewer disconnected");
                    }
                    Some(HubCommand::FilesChanged { paths }) => state.files_changed(&paths),
                    Some(HubCommand::Shutdown) | None => break,
                }
            }
            () = async {
                if let Some(deadline) = deadline {
                    time::sleep_until(deadline).await;
                }
            }, if deadline.is_some() => {
                state.run_cycle().await;
            }
        }
    }
    info!("broadcast hub stopped");
}
