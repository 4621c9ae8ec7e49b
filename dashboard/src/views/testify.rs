//! Traceability between requirements, test specifications and tasks.

use std::collections::HashSet;

use iikit_parser::{
    IntegrityCheck, TestSpec, TestType, parse_requirements, parse_success_criteria,
    parse_tasks, parse_test_specs, test_refs,
};
use serde::Serialize;

use crate::error::Result;
use crate::project::{Project, read_optional};

use super::feature_integrity;

/// A requirement or success criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementNode {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNode {
    pub id: String,
    pub description: String,
    pub checked: bool,
    pub test_refs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    RequirementToTest,
    TestToTask,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEdge {
    pub from: String,
    pub to: String,
    pub kind: TraceKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageGaps {
    pub untested_requirements: Vec<String>,
    pub unimplemented_tests: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PyramidTier {
    pub count: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestPyramid {
    pub acceptance: PyramidTier,
    pub contract: PyramidTier,
    pub validation: PyramidTier,
}

impl TestPyramid {
    fn tier_mut(&mut self, test_type: TestType) -> &mut PyramidTier {
        match test_type {
            TestType::Acceptance => &mut self.acceptance,
            TestType::Contract => &mut self.contract,
            TestType::Validation => &mut self.validation,
        }
    }

    pub fn from_specs(specs: &[TestSpec]) -> Self {
        let mut pyramid = Self::default();
        for spec in specs {
            let tier = pyramid.tier_mut(spec.test_type);
            tier.count += 1;
            tier.ids.push(spec.id.clone());
        }
        pyramid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestifyView {
    pub requirements: Vec<RequirementNode>,
    pub test_specs: Vec<TestSpec>,
    pub tasks: Vec<TaskNode>,
    pub edges: Vec<TraceEdge>,
    pub gaps: CoverageGaps,
    pub pyramid: TestPyramid,
    pub integrity: IntegrityCheck,
    pub exists: bool,
}

/// Edges whose endpoints both exist, plus the gaps they leave.
///
/// Each endpoint pair yields one edge however often it is referenced.
pub fn trace(
    requirements: &[RequirementNode],
    specs: &[TestSpec],
    tasks: &[TaskNode],
) -> (Vec<TraceEdge>, CoverageGaps) {
    let requirement_ids: HashSet<&str> = requirements.iter().map(|req| req.id.as_str()).collect();
    let spec_ids: HashSet<&str> = specs.iter().map(|spec| spec.id.as_str()).collect();

    let mut edges = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut tested: HashSet<&str> = HashSet::new();
    for spec in specs {
        for requirement in &spec.traceability {
            if !requirement_ids.contains(requirement.as_str()) {
                continue;
            }
            tested.insert(requirement.as_str());
            if seen.insert((requirement.as_str(), spec.id.as_str())) {
                edges.push(TraceEdge {
                    from: requirement.clone(),
                    to: spec.id.clone(),
                    kind: TraceKind::RequirementToTest,
                });
            }
        }
    }

    let mut implemented: HashSet<&str> = HashSet::new();
    for task in tasks {
        for test in &task.test_refs {
            if !spec_ids.contains(test.as_str()) {
                continue;
            }
            implemented.insert(test.as_str());
            if seen.insert((test.as_str(), task.id.as_str())) {
                edges.push(TraceEdge {
                    from: test.clone(),
                    to: task.id.clone(),
                    kind: TraceKind::TestToTask,
                });
            }
        }
    }

    let gaps = CoverageGaps {
        untested_requirements: requirements
            .iter()
            .filter(|req| !tested.contains(req.id.as_str()))
            .map(|req| req.id.clone())
            .collect(),
        unimplemented_tests: specs
            .iter()
            .filter(|spec| !implemented.contains(spec.id.as_str()))
            .map(|spec| spec.id.clone())
            .collect(),
    };
    (edges, gaps)
}

pub fn compose(project: &Project, feature_id: &str) -> Result<TestifyView> {
    let feature = project.feature(feature_id)?;
    let spec = read_optional(&feature.spec())?.unwrap_or_default();
    let tasks = read_optional(&feature.tasks())?.unwrap_or_default();
    let test_specs = read_optional(&feature.test_specs())?;

    let requirements: Vec<RequirementNode> = parse_requirements(&spec)
        .into_iter()
        .map(|req| RequirementNode {
            id: req.id,
            text: req.text,
        })
        .chain(
            parse_success_criteria(&spec)
                .into_iter()
                .map(|criterion| RequirementNode {
                    id: criterion.id,
                    text: criterion.text,
                }),
        )
        .collect();
    let tasks: Vec<TaskNode> = parse_tasks(&tasks)
        .into_iter()
        .map(|task| TaskNode {
            test_refs: test_refs(&task.description),
            id: task.id,
            description: task.description,
            checked: task.checked,
        })
        .collect();

    let specs = test_specs.as_deref().map(parse_test_specs).unwrap_or_default();
    let (edges, gaps) = trace(&requirements, &specs, &tasks);
    let integrity = feature_integrity(&feature, test_specs.as_deref())?;
    Ok(TestifyView {
        requirements,
        pyramid: TestPyramid::from_specs(&specs),
        test_specs: specs,
        tasks,
        edges,
        gaps,
        integrity,
        exists: test_specs.is_some(),
    })
}
