//! Messages exchanged with viewers.
//!
//! Server → viewer messages are tagged by `type`; each per-feature update
//! names the feature it belongs to so a viewer can drop stale pushes after
//! switching features.

use serde::{Deserialize, Serialize};

use crate::views::{
    AnalyzeView, BoardView, ChecklistView, ConstitutionView, FeatureSummary, PipelineView,
    PlanView, StoryMapView, TestifyView,
};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    BoardUpdate { feature: String, board: BoardView },
    PipelineUpdate { feature: String, pipeline: PipelineView },
    StorymapUpdate { feature: String, storymap: StoryMapView },
    PlanviewUpdate { feature: String, planview: PlanView },
    ChecklistUpdate { feature: String, checklist: ChecklistView },
    TestifyUpdate { feature: String, testify: TestifyView },
    AnalyzeUpdate { feature: String, analyze: AnalyzeView },
    FeaturesUpdate { features: Vec<FeatureSummary> },
    ConstitutionUpdate { constitution: ConstitutionView },
}

impl ServerMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::BoardUpdate { .. } => "board_update",
            ServerMessage::PipelineUpdate { .. } => "pipeline_update",
            ServerMessage::StorymapUpdate { .. } => "storymap_update",
            ServerMessage::PlanviewUpdate { .. } => "planview_update",
            ServerMessage::ChecklistUpdate { .. } => "checklist_update",
            ServerMessage::TestifyUpdate { .. } => "testify_update",
            ServerMessage::AnalyzeUpdate { .. } => "analyze_update",
            ServerMessage::FeaturesUpdate { .. } => "features_update",
            ServerMessage::ConstitutionUpdate { .. } => "constitution_update",
        }
    }

    /// Feature the update belongs to; `None` for project-wide listings.
    pub fn feature(&self) -> Option<&str> {
        match self {
            ServerMessage::BoardUpdate { feature, .. }
            | ServerMessage::PipelineUpdate { feature, .. }
            | ServerMessage::StorymapUpdate { feature, .. }
            | ServerMessage::PlanviewUpdate { feature, .. }
            | ServerMessage::ChecklistUpdate { feature, .. }
            | ServerMessage::TestifyUpdate { feature, .. }
            | ServerMessage::AnalyzeUpdate { feature, .. } => Some(feature),
            ServerMessage::FeaturesUpdate { .. } | ServerMessage::ConstitutionUpdate { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { feature: String },
}

/// Parse a viewer's text frame. Anything unrecognised is ignored.
pub fn parse_client_message(text: &str) -> Option<ClientMessage> {
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(err) => {
            tracing::debug!("ignoring client message: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::ConstitutionView;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_subscribe_and_ignores_noise() {
        assert_eq!(
            parse_client_message(r#"{"type":"subscribe","feature":"001-auth"}"#),
            Some(ClientMessage::Subscribe {
                feature: "001-auth".to_string()
            })
        );
        assert_eq!(parse_client_message("not json"), None);
        assert_eq!(parse_client_message(r#"{"type":"dance"}"#), None);
        assert_eq!(parse_client_message(r#"{"type":"subscribe"}"#), None);
    }

    #[test]
    fn messages_are_tagged_by_type() {
        let message = ServerMessage::ConstitutionUpdate {
            constitution: ConstitutionView {
                principles: Vec::new(),
                version: None,
                exists: false,
            },
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "constitution_update");
        assert_eq!(value["constitution"]["exists"], false);
        assert_eq!(message.kind(), "constitution_update");
        assert_eq!(message.feature(), None);
    }
}
