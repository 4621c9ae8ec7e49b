//! Workflow phase tracker.

use iikit_parser::{parse_clarifications, parse_tasks};
use serde::Serialize;

use crate::error::Result;
use crate::project::{FeatureDir, Project, read_optional};

use super::checklist;
use super::percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Complete,
    InProgress,
    NotStarted,
}

impl PhaseStatus {
    fn present(exists: bool) -> Self {
        if exists {
            PhaseStatus::Complete
        } else {
            PhaseStatus::NotStarted
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    Constitution,
    Spec,
    Clarify,
    Plan,
    Checklist,
    Testify,
    Tasks,
    Analyze,
    Implement,
}

impl PhaseId {
    pub fn all() -> &'static [PhaseId] {
        &[
            PhaseId::Constitution,
            PhaseId::Spec,
            PhaseId::Clarify,
            PhaseId::Plan,
            PhaseId::Checklist,
            PhaseId::Testify,
            PhaseId::Tasks,
            PhaseId::Analyze,
            PhaseId::Implement,
        ]
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            PhaseId::Constitution => "Constitution",
            PhaseId::Spec => "Spec",
            PhaseId::Clarify => "Clarify",
            PhaseId::Plan => "Plan",
            PhaseId::Checklist => "Checklist",
            PhaseId::Testify => "Testify",
            PhaseId::Tasks => "Tasks",
            PhaseId::Analyze => "Analyze",
            PhaseId::Implement => "Implement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub id: PhaseId,
    pub name: String,
    pub status: PhaseStatus,
    /// Rounded percentage (`"40%"`) for phases measured by completion.
    pub progress: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineView {
    pub phases: Vec<Phase>,
}

/// Status plus progress for a phase measured by a checked fraction.
fn completion(checked: usize, total: usize) -> (PhaseStatus, Option<String>) {
    if checked == 0 {
        return (PhaseStatus::NotStarted, None);
    }
    let percent = percentage(checked, total);
    if checked >= total {
        (PhaseStatus::Complete, Some("100%".to_string()))
    } else {
        (PhaseStatus::InProgress, Some(format!("{percent}%")))
    }
}

fn phase_status(
    project: &Project,
    feature: &FeatureDir,
    phase: PhaseId,
) -> Result<(PhaseStatus, Option<String>)> {
    let status = match phase {
        PhaseId::Constitution => PhaseStatus::present(project.constitution_path().is_some()),
        PhaseId::Spec => PhaseStatus::present(feature.spec().is_file()),
        PhaseId::Clarify => {
            let spec = read_optional(&feature.spec())?.unwrap_or_default();
            PhaseStatus::present(!parse_clarifications(&spec).is_empty())
        }
        PhaseId::Plan => PhaseStatus::present(feature.plan().is_file()),
        PhaseId::Checklist => {
            return Ok(match checklist::summary(feature)? {
                None => (PhaseStatus::NotStarted, None),
                Some(summary) if summary.total > 0 && summary.checked == summary.total => {
                    (PhaseStatus::Complete, Some("100%".to_string()))
                }
                Some(summary) => (
                    PhaseStatus::InProgress,
                    Some(format!("{}%", summary.percentage())),
                ),
            });
        }
        PhaseId::Testify => PhaseStatus::present(feature.test_specs().is_file()),
        PhaseId::Tasks => PhaseStatus::present(feature.tasks().is_file()),
        PhaseId::Analyze => PhaseStatus::present(feature.analysis().is_file()),
        PhaseId::Implement => {
            let tasks = parse_tasks(&read_optional(&feature.tasks())?.unwrap_or_default());
            let checked = tasks.iter().filter(|task| task.checked).count();
            return Ok(completion(checked, tasks.len()));
        }
    };
    Ok((status, None))
}

pub fn compose(project: &Project, feature_id: &str) -> Result<PipelineView> {
    let feature = project.feature(feature_id)?;
    let mut phases = Vec::with_capacity(PhaseId::all().len());
    for &id in PhaseId::all() {
        let (status, progress) = phase_status(project, &feature, id)?;
        phases.push(Phase {
            id,
            name: id.display_name().to_string(),
            status,
            progress,
        });
    }
    Ok(PipelineView { phases })
}
