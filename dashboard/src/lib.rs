//! Live dashboard over a spec-driven development project.
//!
//! [`Dashboard`] composes the per-feature views (board, pipeline, story map,
//! plan view, checklist, testify, analyze) and the project-wide listings from
//! the markdown tree on disk. [`DashboardRuntime`] adds file watching and a
//! [`broadcast`] hub that pushes recomputed views to subscribed viewers.
//!
//! Transport is left to the caller: connect viewers through a
//! [`HubHandle`], forward their text frames, and send each
//! [`ServerMessage`] as JSON.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod broadcast;
pub mod classifier;
pub mod config;
pub mod error;
pub mod project;
pub mod protocol;
pub mod runtime;
pub mod service;
pub mod views;
pub mod watcher;

pub use broadcast::{BroadcastHub, HubHandle, Viewer, ViewerId};
pub use classifier::{AnthropicClassifier, ClassificationCache, DefaultClassifier, NodeClassifier};
pub use config::{ConfigLoader, DashboardConfig};
pub use error::{DashboardError, Result};
pub use project::{FeatureDir, Project};
pub use protocol::{ClientMessage, ServerMessage, parse_client_message};
pub use runtime::DashboardRuntime;
pub use service::{Dashboard, Query, ViewKind};
pub use watcher::ProjectWatcher;
