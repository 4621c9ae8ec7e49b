//! Story map: stories, requirements and the edges between them.

use std::collections::HashSet;

use iikit_parser::{
    Clarification, Requirement, SuccessCriterion, UserStory, parse_clarifications,
    parse_requirements, parse_spec_stories, parse_success_criteria,
};
use serde::Serialize;

use crate::error::Result;
use crate::project::{Project, read_optional};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMapView {
    pub stories: Vec<UserStory>,
    pub requirements: Vec<Requirement>,
    pub success_criteria: Vec<SuccessCriterion>,
    pub clarifications: Vec<Clarification>,
    pub edges: Vec<StoryEdge>,
    pub exists: bool,
}

/// Story → requirement edges, deduplicated per story and limited to declared requirements.
pub fn story_edges(
    stories: &[UserStory],
    requirements: &[Requirement],
    clarifications: &[Clarification],
) -> Vec<StoryEdge> {
    let declared: HashSet<&str> = requirements.iter().map(|req| req.id.as_str()).collect();
    let mut edges = Vec::new();
    for story in stories {
        let from_clarifications = clarifications
            .iter()
            .filter(|clarification| clarification.refs.contains(&story.id))
            .flat_map(|clarification| clarification.refs.iter())
            .filter(|reference| reference.starts_with("FR-"));

        let mut seen: HashSet<&str> = HashSet::new();
        for target in story.requirement_refs.iter().chain(from_clarifications) {
            if declared.contains(target.as_str()) && seen.insert(target.as_str()) {
                edges.push(StoryEdge {
                    from: story.id.clone(),
                    to: target.clone(),
                });
            }
        }
    }
    edges
}

pub fn compose(project: &Project, feature_id: &str) -> Result<StoryMapView> {
    let feature = project.feature(feature_id)?;
    let Some(spec) = read_optional(&feature.spec())? else {
        return Ok(StoryMapView {
            stories: Vec::new(),
            requirements: Vec::new(),
            success_criteria: Vec::new(),
            clarifications: Vec::new(),
            edges: Vec::new(),
            exists: false,
        });
    };

    let stories = parse_spec_stories(&spec);
    let requirements = parse_requirements(&spec);
    let clarifications = parse_clarifications(&spec);
    let edges = story_edges(&stories, &requirements, &clarifications);
    Ok(StoryMapView {
        stories,
        requirements,
        success_criteria: parse_success_criteria(&spec),
        clarifications,
        edges,
        exists: true,
    })
}
