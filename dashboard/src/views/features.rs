//! Project-wide feature listing.

use iikit_parser::{parse_spec_stories, parse_tasks};
use serde::Serialize;

use crate::error::Result;
use crate::project::{FeatureDir, Project, read_optional};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSummary {
    pub id: String,
    /// `003-user-auth` → `User Auth`.
    pub name: String,
    pub stories: usize,
    /// `"checked/total"` across all tasks.
    pub progress: String,
}

pub(crate) fn feature_name(id: &str) -> String {
    let without_number = id.trim_start_matches(|c: char| c.is_ascii_digit());
    let words = without_number.trim_start_matches(['-', '_']);
    let words = if words.is_empty() { id } else { words };
    super::checklist::display_name(words)
}

/// Every feature, newest first.
///
/// A feature whose documents cannot be read is listed with zero counts
/// instead of failing the whole listing.
pub fn compose(project: &Project) -> Result<Vec<FeatureSummary>> {
    Ok(project.features()?.into_iter().map(summarize).collect())
}

fn summarize(feature: FeatureDir) -> FeatureSummary {
    let (stories, checked, total) = match counts(&feature) {
        Ok(counts) => counts,
        Err(err) => {
            tracing::warn!(feature = %feature.id, "listing feature without counts: {err}");
            (0, 0, 0)
        }
    };
    FeatureSummary {
        name: feature_name(&feature.id),
        stories,
        progress: format!("{checked}/{total}"),
        id: feature.id,
    }
}

/// `(stories, checked tasks, total tasks)`.
fn counts(feature: &FeatureDir) -> Result<(usize, usize, usize)> {
    let spec = read_optional(&feature.spec())?.unwrap_or_default();
    let tasks = parse_tasks(&read_optional(&feature.tasks())?.unwrap_or_default());
    let checked = tasks.iter().filter(|task| task.checked).count();
    Ok((parse_spec_stories(&spec).len(), checked, tasks.len()))
}
