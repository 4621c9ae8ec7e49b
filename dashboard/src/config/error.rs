use std::path::PathBuf;
use thiserror::Error;

/// Why a dashboard configuration could not be produced
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer (file or `IIKIT_DASHBOARD_*` variable) failed to parse or merge
    #[error("Failed to load dashboard configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// An explicitly requested config file does not exist
    #[error("Dashboard config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Built-in defaults could not be encoded as the base layer
    #[error("Failed to encode default configuration: {0}")]
    Defaults(#[from] serde_json::Error),

    /// Values that parsed but cannot drive the watcher or composers
    #[error("Invalid dashboard configuration: {0}")]
    Invalid(String),
}

/// Type alias for Results using ConfigError
pub type Result<T> = std::result::Result<T, ConfigError>;
