//! View composers.
//!
//! Each composer takes a [`Project`] and a feature id, reads the documents it
//! needs and returns one serializable view state. A missing feature directory
//! is [`DashboardError::FeatureNotFound`]; a missing document inside an
//! existing feature yields an empty view with `exists: false`.
//!
//! [`DashboardError::FeatureNotFound`]: crate::error::DashboardError::FeatureNotFound

pub mod analyze;
pub mod board;
pub mod checklist;
pub mod constitution;
pub mod features;
pub mod pipeline;
pub mod planview;
pub mod storymap;
pub mod testify;

use iikit_parser::{IntegrityCheck, check_integrity, compute_assertion_hash};
use serde::Deserialize;

use crate::error::Result;
use crate::project::{FeatureDir, read_optional};

pub use analyze::AnalyzeView;
pub use board::BoardView;
pub use checklist::ChecklistView;
pub use constitution::ConstitutionView;
pub use features::FeatureSummary;
pub use pipeline::PipelineView;
pub use planview::{PlanView, PlanViewComposer};
pub use storymap::StoryMapView;
pub use testify::TestifyView;

#[derive(Debug, Default, Deserialize)]
struct FeatureContext {
    #[serde(default)]
    testify: Option<TestifyContext>,
}

#[derive(Debug, Default, Deserialize)]
struct TestifyContext {
    #[serde(default)]
    assertion_hash: Option<String>,
}

/// Assertion hash recorded in `context.json` when the test specs were generated.
///
/// A blank recorded hash counts as no hash.
fn stored_assertion_hash(feature: &FeatureDir) -> Result<Option<String>> {
    let Some(content) = read_optional(&feature.context())? else {
        return Ok(None);
    };
    match serde_json::from_str::<FeatureContext>(&content) {
        Ok(context) => Ok(context
            .testify
            .and_then(|testify| testify.assertion_hash)
            .filter(|hash| !hash.trim().is_empty())),
        Err(err) => {
            tracing::debug!(feature = %feature.id, "ignoring malformed context.json: {err}");
            Ok(None)
        }
    }
}

/// Compare the live test-spec assertions with the recorded hash.
pub(crate) fn feature_integrity(
    feature: &FeatureDir,
    test_specs: Option<&str>,
) -> Result<IntegrityCheck> {
    let current = compute_assertion_hash(test_specs);
    let stored = stored_assertion_hash(feature)?;
    Ok(check_integrity(current.as_deref(), stored.as_deref()))
}

/// `checked * 100 / total`, rounded; zero when there is nothing to count.
pub(crate) fn percentage(checked: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((checked as f64 * 100.0) / total as f64).round() as u32
}
