/// Configuration module for the dashboard
///
/// Layered configuration:
/// 1. Defaults (from code)
/// 2. Config file (iikit-dashboard.toml)
/// 3. Environment variables (IIKIT_DASHBOARD_* prefix)
///
/// # Example
///
/// ```no_run
/// use iikit_dashboard::config::ConfigLoader;
///
/// // Load for a project, picking up ./iikit-dashboard.toml when present
/// let config = ConfigLoader::load_for_project(std::path::Path::new("."))
///     .expect("Failed to load config");
///
/// // Or load from a specific file
/// let config = ConfigLoader::new()
///     .with_file("./dashboard.toml")
///     .load()
///     .expect("Failed to load config");
/// ```
pub mod error;
pub mod loader;

pub use error::{ConfigError, Result};
pub use loader::{ClassifierConfig, ConfigLoader, DashboardConfig, LayoutConfig, WatchConfig};
