//! Error types for dashboard operations

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Dashboard result type alias
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Dashboard error taxonomy
///
/// Malformed or missing documents are not errors: composers degrade to empty
/// views. Only a missing feature and genuine I/O trouble surface here.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize JSON: {source}")]
    Json { source: serde_json::Error },

    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Broadcast hub has shut down")]
    HubClosed,

    #[error("Unknown view: {0}")]
    UnknownView(String),
}

impl DashboardError {
    /// Whether the caller should map this to a not-found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DashboardError::FeatureNotFound(_))
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(source: serde_json::Error) -> Self {
        DashboardError::Json { source }
    }
}

impl From<notify::Error> for DashboardError {
    fn from(err: notify::Error) -> Self {
        DashboardError::Watch {
            path: err.paths.first().cloned().unwrap_or_default(),
            message: err.to_string(),
        }
    }
}
