//! Project layout: where features and shared artifacts live on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::LayoutConfig;
use crate::error::{DashboardError, Result};

/// A project root plus the layout used to find its artifacts.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    layout: LayoutConfig,
}

/// One feature directory, e.g. `specs/001-auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDir {
    pub id: String,
    pub path: PathBuf,
}

impl FeatureDir {
    pub fn spec(&self) -> PathBuf {
        self.path.join("spec.md")
    }

    pub fn tasks(&self) -> PathBuf {
        self.path.join("tasks.md")
    }

    pub fn plan(&self) -> PathBuf {
        self.path.join("plan.md")
    }

    pub fn research(&self) -> PathBuf {
        self.path.join("research.md")
    }

    pub fn test_specs(&self) -> PathBuf {
        self.path.join("tests").join("test-specs.md")
    }

    /// Per-feature metadata holding the recorded assertion hash.
    pub fn context(&self) -> PathBuf {
        self.path.join("context.json")
    }

    pub fn analysis(&self) -> PathBuf {
        self.path.join("analysis.md")
    }

    pub fn checklists(&self) -> PathBuf {
        self.path.join("checklists")
    }
}

/// Numeric prefix of a feature directory name (`001-auth` → 1).
pub fn feature_number(name: &str) -> Option<u64> {
    let digits: String = name.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Read a file that may legitimately be absent.
///
/// Invalid UTF-8 is replaced rather than rejected so one stray byte only
/// garbles the affected text.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!(path = %path.display(), "decoding invalid UTF-8 lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        })),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(DashboardError::FileRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, layout: LayoutConfig) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn specs_dir(&self) -> PathBuf {
        self.root.join(&self.layout.specs_dir)
    }

    pub fn tile_manifest(&self) -> PathBuf {
        self.root.join(&self.layout.tile_manifest)
    }

    /// First constitution candidate that exists.
    pub fn constitution_path(&self) -> Option<PathBuf> {
        self.layout
            .constitution_paths
            .iter()
            .map(|candidate| self.root.join(candidate))
            .find(|path| path.is_file())
    }

    /// Resolve a feature id to its directory.
    ///
    /// Ids that could escape the specs directory are treated as unknown.
    pub fn feature(&self, id: &str) -> Result<FeatureDir> {
        let unsafe_id = id.is_empty()
            || id == "."
            || id.contains("..")
            || id.contains('/')
            || id.contains('\\');
        if unsafe_id {
            return Err(DashboardError::FeatureNotFound(id.to_string()));
        }
        let path = self.specs_dir().join(id);
        if !path.is_dir() {
            return Err(DashboardError::FeatureNotFound(id.to_string()));
        }
        Ok(FeatureDir {
            id: id.to_string(),
            path,
        })
    }

    /// Feature directories, newest (highest numeric prefix) first.
    pub fn features(&self) -> Result<Vec<FeatureDir>> {
        let specs_dir = self.specs_dir();
        let entries = match std::fs::read_dir(&specs_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(DashboardError::DirectoryRead {
                    path: specs_dir,
                    source,
                });
            }
        };

        let mut features: Vec<(u64, FeatureDir)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DashboardError::DirectoryRead {
                path: specs_dir.clone(),
                source,
            })?;
            if !entry.file_type().is_ok_and(|kind| kind.is_dir()) {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(number) = feature_number(&id) else {
                continue;
            };
            features.push((
                number,
                FeatureDir {
                    id,
                    path: entry.path(),
                },
            ));
        }

        features.sort_by(|(a_num, a), (b_num, b)| b_num.cmp(a_num).then_with(|| b.id.cmp(&a.id)));
        Ok(features.into_iter().map(|(_, feature)| feature).collect())
    }

    /// Feature id owning `path`, when the path lies inside a feature directory.
    pub fn feature_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(self.specs_dir()).ok()?;
        let first = relative.components().next()?;
        let id = first.as_os_str().to_str()?;
        feature_number(id).map(|_| id.to_string())
    }
}
