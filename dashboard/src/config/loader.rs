use crate::config::error::{ConfigError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-project config file.
pub const PROJECT_CONFIG_FILE: &str = "iikit-dashboard.toml";

/// Upper bound for the write-settle window.
const MAX_SETTLE_MS: u64 = 10_000;

/// Root dashboard configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// File watching and debounce timing
    #[serde(default)]
    pub watch: WatchConfig,

    /// Diagram node classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Where artifacts live inside the project
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// File watching configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period after the last write to a path before it counts as stable
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Delay after the last stable change before views are recomputed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Directory names never watched (dependencies, version control)
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
}

/// Diagram node classification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Use the remote classifier when a credential is available
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Messages API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Hard limit for one classification call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Project layout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Directory (relative to the project root) holding one folder per feature
    #[serde(default = "default_specs_dir")]
    pub specs_dir: PathBuf,

    /// Constitution candidates, first existing file wins
    #[serde(default = "default_constitution_paths")]
    pub constitution_paths: Vec<PathBuf>,

    /// Tile dependency manifest at the project root
    #[serde(default = "default_tile_manifest")]
    pub tile_manifest: PathBuf,
}

// Default value functions
fn default_settle_ms() -> u64 {
    200
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_ignored_dirs() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".git".to_string(),
        "target".to_string(),
    ]
}
fn default_true() -> bool {
    true
}
fn default_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}
fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_tokens() -> u32 {
    256
}
fn default_specs_dir() -> PathBuf {
    PathBuf::from("specs")
}
fn default_constitution_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("CONSTITUTION.md"),
        PathBuf::from(".specify/memory/constitution.md"),
    ]
}
fn default_tile_manifest() -> PathBuf {
    PathBuf::from("tessl.json")
}

// Default implementations
impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            debounce_ms: default_debounce_ms(),
            ignored_dirs: default_ignored_dirs(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            specs_dir: default_specs_dir(),
            constitution_paths: default_constitution_paths(),
            tile_manifest: default_tile_manifest(),
        }
    }
}

impl WatchConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Whether any component of `path` is an ignored directory.
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| self.ignored_dirs.iter().any(|dir| dir == name))
        })
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DashboardConfig {
    /// Reject settings the watcher and composers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "watch.debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.watch.settle_ms == 0 || self.watch.settle_ms > MAX_SETTLE_MS {
            return Err(ConfigError::Invalid(format!(
                "watch.settle_ms must be between 1 and {MAX_SETTLE_MS}, got {}",
                self.watch.settle_ms
            )));
        }
        if self.classifier.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "classifier.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.layout.specs_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "layout.specs_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loader with layered merging support
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new ConfigLoader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults (from Default implementations)
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (IIKIT_DASHBOARD_ prefix)
    pub fn load(&self) -> Result<DashboardConfig> {
        let mut builder = Config::builder();

        // Layer 1: Defaults (serialize defaults to JSON and load as base)
        let defaults_json = serde_json::to_string(&DashboardConfig::default())?;
        builder = builder.add_source(File::from_str(&defaults_json, config::FileFormat::Json));

        // Layer 2: Config file (if provided)
        if let Some(ref path) = self.config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_ref()));
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        // Layer 3: Environment variables, double underscore for nesting
        // Example: IIKIT_DASHBOARD_WATCH__DEBOUNCE_MS=500
        builder = builder.add_source(
            Environment::with_prefix("IIKIT_DASHBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("watch.ignored_dirs")
                .with_list_parse_key("layout.constitution_paths"),
        );

        let config: DashboardConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::debug!(?config, "dashboard configuration loaded");
        Ok(config)
    }

    /// Locate the config file for a project:
    /// 1. Project root: ./iikit-dashboard.toml
    /// 2. XDG config: ~/.config/iikit-dashboard/config.toml
    pub fn find_config_file(project_root: &Path) -> Option<PathBuf> {
        let project_config = project_root.join(PROJECT_CONFIG_FILE);
        if project_config.exists() {
            return Some(project_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("iikit-dashboard").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    /// Load configuration for a project from the default locations
    pub fn load_for_project(project_root: &Path) -> Result<DashboardConfig> {
        let loader = match Self::find_config_file(project_root) {
            Some(config_path) => ConfigLoader::new().with_file(config_path),
            None => ConfigLoader::new(),
        };
        loader.load()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
