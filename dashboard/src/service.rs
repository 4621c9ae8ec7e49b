//! Dashboard facade: every view behind one object plus a JSON query entry
//! point for whatever transport fronts it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::classifier::{self, NodeClassifier};
use crate::config::{DashboardConfig, LayoutConfig};
use crate::error::{DashboardError, Result};
use crate::project::Project;
use crate::protocol::ServerMessage;
use crate::views::{
    self, AnalyzeView, BoardView, ChecklistView, ConstitutionView, FeatureSummary, PipelineView,
    PlanView, PlanViewComposer, StoryMapView, TestifyView,
};

/// Views a caller can ask for by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Features,
    Constitution,
    Board,
    Pipeline,
    Storymap,
    Planview,
    Checklist,
    Testify,
    Analyze,
}

impl ViewKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ViewKind::Features => "features",
            ViewKind::Constitution => "constitution",
            ViewKind::Board => "board",
            ViewKind::Pipeline => "pipeline",
            ViewKind::Storymap => "storymap",
            ViewKind::Planview => "planview",
            ViewKind::Checklist => "checklist",
            ViewKind::Testify => "testify",
            ViewKind::Analyze => "analyze",
        }
    }

    pub const fn is_per_feature(self) -> bool {
        !matches!(self, ViewKind::Features | ViewKind::Constitution)
    }
}

/// `{"view": "board", "feature": "001-auth"}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Query {
    pub view: ViewKind,
    #[serde(default)]
    pub feature: Option<String>,
}

pub struct Dashboard {
    project: Project,
    plan_view: PlanViewComposer,
}

impl Dashboard {
    /// Dashboard whose classifier follows the configuration.
    pub fn new(root: impl Into<PathBuf>, config: &DashboardConfig) -> Self {
        Self::with_classifier(
            root,
            config.layout.clone(),
            classifier::from_config(&config.classifier),
            config.classifier.timeout(),
        )
    }

    pub fn with_classifier(
        root: impl Into<PathBuf>,
        layout: LayoutConfig,
        classifier: Arc<dyn NodeClassifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            project: Project::new(root, layout),
            plan_view: PlanViewComposer::new(classifier, timeout),
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn features(&self) -> Result<Vec<FeatureSummary>> {
        views::features::compose(&self.project)
    }

    pub fn constitution(&self) -> Result<ConstitutionView> {
        views::constitution::compose(&self.project)
    }

    pub fn board(&self, feature: &str) -> Result<BoardView> {
        views::board::compose(&self.project, feature)
    }

    pub fn pipeline(&self, feature: &str) -> Result<PipelineView> {
        views::pipeline::compose(&self.project, feature)
    }

    pub fn story_map(&self, feature: &str) -> Result<StoryMapView> {
        views::storymap::compose(&self.project, feature)
    }

    pub async fn plan_view(&self, feature: &str) -> Result<PlanView> {
        self.plan_view.compose(&self.project, feature).await
    }

    pub fn checklist(&self, feature: &str) -> Result<ChecklistView> {
        views::checklist::compose(&self.project, feature)
    }

    pub fn testify(&self, feature: &str) -> Result<TestifyView> {
        views::testify::compose(&self.project, feature)
    }

    pub fn analyze(&self, feature: &str) -> Result<AnalyzeView> {
        views::analyze::compose(&self.project, feature)
    }

    /// Drop cached diagram classifications for a feature.
    pub fn invalidate_plan(&self, feature: &str) {
        self.plan_view.invalidate(feature);
    }

    /// Compose one view by name and return its JSON form.
    pub async fn query(&self, query: &Query) -> Result<Value> {
        let value = match (query.view, query.feature.as_deref()) {
            (ViewKind::Features, _) => serde_json::to_value(self.features()?)?,
            (ViewKind::Constitution, _) => serde_json::to_value(self.constitution()?)?,
            (_, None) => return Err(DashboardError::FeatureNotFound(String::new())),
            (ViewKind::Board, Some(feature)) => serde_json::to_value(self.board(feature)?)?,
            (ViewKind::Pipeline, Some(feature)) => serde_json::to_value(self.pipeline(feature)?)?,
            (ViewKind::Storymap, Some(feature)) => serde_json::to_value(self.story_map(feature)?)?,
            (ViewKind::Planview, Some(feature)) => {
                serde_json::to_value(self.plan_view(feature).await?)?
            }
            (ViewKind::Checklist, Some(feature)) => serde_json::to_value(self.checklist(feature)?)?,
            (ViewKind::Testify, Some(feature)) => serde_json::to_value(self.testify(feature)?)?,
            (ViewKind::Analyze, Some(feature)) => serde_json::to_value(self.analyze(feature)?)?,
        };
        Ok(value)
    }

    /// Parse a raw JSON query, then run it.
    pub async fn query_json(&self, raw: &Value) -> Result<Value> {
        let query: Query = match serde_json::from_value(raw.clone()) {
            Ok(query) => query,
            Err(err) => {
                let view = raw
                    .get("view")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                tracing::debug!("rejecting query: {err}");
                return Err(DashboardError::UnknownView(view));
            }
        };
        self.query(&query).await
    }

    /// Every per-feature update for one feature. A view that fails is logged
    /// and left out; the others are still returned.
    pub async fn feature_updates(&self, feature: &str) -> Vec<ServerMessage> {
        let id = feature.to_string();
        let mut messages = Vec::with_capacity(7);
        let mut push = |view: &str, result: Result<ServerMessage>| match result {
            Ok(message) => messages.push(message),
            Err(err) => tracing::warn!(feature, view, "failed to compose view: {err}"),
        };

        push(
            "board",
            self.board(feature).map(|board| ServerMessage::BoardUpdate {
                feature: id.clone(),
                board,
            }),
        );
        push(
            "pipeline",
            self.pipeline(feature)
                .map(|pipeline| ServerMessage::PipelineUpdate {
                    feature: id.clone(),
                    pipeline,
                }),
        );
        push(
            "storymap",
            self.story_map(feature)
                .map(|storymap| ServerMessage::StorymapUpdate {
                    feature: id.clone(),
                    storymap,
                }),
        );
        push(
            "planview",
            self.plan_view(feature)
                .await
                .map(|planview| ServerMessage::PlanviewUpdate {
                    feature: id.clone(),
                    planview,
                }),
        );
        push(
            "checklist",
            self.checklist(feature)
                .map(|checklist| ServerMessage::ChecklistUpdate {
                    feature: id.clone(),
                    checklist,
                }),
        );
        push(
            "testify",
            self.testify(feature)
                .map(|testify| ServerMessage::TestifyUpdate {
                    feature: id.clone(),
                    testify,
                }),
        );
        push(
            "analyze",
            self.analyze(feature)
                .map(|analyze| ServerMessage::AnalyzeUpdate {
                    feature: id,
                    analyze,
                }),
        );
        messages
    }

    /// Project-wide listings pushed to every viewer.
    pub fn project_updates(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::with_capacity(2);
        match self.features() {
            Ok(features) => messages.push(ServerMessage::FeaturesUpdate { features }),
            Err(err) => tracing::warn!("failed to list features: {err}"),
        }
        match self.constitution() {
            Ok(constitution) => messages.push(ServerMessage::ConstitutionUpdate { constitution }),
            Err(err) => tracing::warn!("failed to read constitution: {err}"),
        }
        messages
    }
}
