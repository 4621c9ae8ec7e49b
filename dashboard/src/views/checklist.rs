//! Checklist progress per file plus the aggregate gate.

use std::path::Path;

use iikit_parser::{ChecklistItem, is_domain_checklist, parse_checklist};
use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::project::{FeatureDir, Project, read_optional};

use super::percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateLevel {
    Green,
    Yellow,
    Red,
}

impl GateLevel {
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            100.. => GateLevel::Green,
            50.. => GateLevel::Yellow,
            _ => GateLevel::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Open,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gate {
    pub status: GateStatus,
    pub level: GateLevel,
    pub label: String,
}

impl Gate {
    fn from_files(files: &[ChecklistFile]) -> Self {
        let total: usize = files.iter().map(|file| file.total).sum();
        let checked: usize = files.iter().map(|file| file.checked).sum();
        let level = if files.is_empty() {
            GateLevel::Red
        } else {
            GateLevel::for_percentage(percentage(checked, total))
        };
        let status = if level == GateLevel::Green {
            GateStatus::Open
        } else {
            GateStatus::Blocked
        };
        let label = match status {
            GateStatus::Open => "GATE: OPEN",
            GateStatus::Blocked => "GATE: BLOCKED",
        };
        Self {
            status,
            level,
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistFile {
    /// Display name derived from the filename (`api-security.md` → `Api Security`).
    pub name: String,
    pub filename: String,
    pub total: usize,
    pub checked: usize,
    pub percentage: u32,
    pub color: GateLevel,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistView {
    pub files: Vec<ChecklistFile>,
    pub gate: Gate,
}

/// Aggregate counts used by the pipeline's checklist phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistSummary {
    pub total: usize,
    pub checked: usize,
}

impl ChecklistSummary {
    pub fn percentage(self) -> u32 {
        percentage(self.checked, self.total)
    }
}

pub(crate) fn display_name(filename: &str) -> String {
    let stem = filename.strip_suffix(".md").unwrap_or(filename);
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn markdown_files(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(DashboardError::DirectoryRead {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DashboardError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        if let Some(name) = entry.file_name().to_str()
            && name.ends_with(".md")
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Parsed checklist files, or nothing until a domain checklist exists.
pub(crate) fn load_checklists(feature: &FeatureDir) -> Result<Vec<ChecklistFile>> {
    let dir = feature.checklists();
    let filenames = markdown_files(&dir)?;
    if !filenames.iter().any(|name| is_domain_checklist(name)) {
        return Ok(Vec::new());
    }

    let mut files = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let content = read_optional(&dir.join(&filename))?.unwrap_or_default();
        let items = parse_checklist(&content);
        let total = items.len();
        let checked = items.iter().filter(|item| item.checked).count();
        let percentage = percentage(checked, total);
        files.push(ChecklistFile {
            name: display_name(&filename),
            filename,
            total,
            checked,
            percentage,
            color: GateLevel::for_percentage(percentage),
            items,
        });
    }
    Ok(files)
}

/// `None` while the checklist phase has not started.
pub(crate) fn summary(feature: &FeatureDir) -> Result<Option<ChecklistSummary>> {
    let files = load_checklists(feature)?;
    if files.is_empty() {
        return Ok(None);
    }
    Ok(Some(ChecklistSummary {
        total: files.iter().map(|file| file.total).sum(),
        checked: files.iter().map(|file| file.checked).sum(),
    }))
}

pub fn compose(project: &Project, feature_id: &str) -> Result<ChecklistView> {
    let feature = project.feature(feature_id)?;
    let files = load_checklists(&feature)?;
    let gate = Gate::from_files(&files);
    Ok(ChecklistView { files, gate })
}
