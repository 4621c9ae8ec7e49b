//! Plan view: technical context, research decisions, the planned file tree
//! checked against disk, the architecture diagram and declared tiles.

use std::sync::Arc;
use std::time::Duration;

use iikit_parser::{
    Diagram, EntryKind, FileStructure, ResearchDecision, TechContextEntry, TesslTile,
    parse_ascii_diagram, parse_file_structure, parse_research_decisions, parse_tech_context,
    parse_tile_manifest,
};
use serde::Serialize;

use crate::classifier::{ClassificationCache, NodeClassifier, default_categories};
use crate::error::Result;
use crate::project::{Project, read_optional};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub comment: Option<String>,
    pub depth: usize,
    /// Whether the reconstructed path exists under the project root.
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStructure {
    pub root_name: Option<String>,
    pub entries: Vec<PlannedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub tech_context: Vec<TechContextEntry>,
    pub research_decisions: Vec<ResearchDecision>,
    pub file_structure: Option<PlannedStructure>,
    pub diagram: Option<Diagram>,
    pub tessl_tiles: Vec<TesslTile>,
    pub exists: bool,
}

impl PlanView {
    fn missing() -> Self {
        Self {
            tech_context: Vec::new(),
            research_decisions: Vec::new(),
            file_structure: None,
            diagram: None,
            tessl_tiles: Vec::new(),
            exists: false,
        }
    }
}

fn annotate_existence(project: &Project, structure: FileStructure) -> PlannedStructure {
    let entries = (0..structure.entries.len())
        .filter_map(|index| {
            let entry = structure.entries.get(index)?;
            let exists = structure
                .relative_path(index)
                .is_some_and(|relative| project.root().join(relative).exists());
            Some(PlannedEntry {
                name: entry.name.clone(),
                kind: entry.kind,
                comment: entry.comment.clone(),
                depth: entry.depth,
                exists,
            })
        })
        .collect();
    PlannedStructure {
        root_name: structure.root_name,
        entries,
    }
}

/// Composes plan views and owns the classification cache.
pub struct PlanViewComposer {
    classifier: Arc<dyn NodeClassifier>,
    cache: ClassificationCache,
    timeout: Duration,
}

impl PlanViewComposer {
    pub fn new(classifier: Arc<dyn NodeClassifier>, timeout: Duration) -> Self {
        Self {
            classifier,
            cache: ClassificationCache::new(),
            timeout,
        }
    }

    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }

    /// Forget classifications for a feature whose plan changed.
    pub fn invalidate(&self, feature_id: &str) {
        self.cache.invalidate(feature_id);
    }

    async fn classify(&self, feature_id: &str, plan: &str, diagram: &mut Diagram) {
        if diagram.nodes.is_empty() {
            return;
        }
        let digest = ClassificationCache::digest(plan);
        let categories = match self.cache.get(feature_id, &digest) {
            Some(cached) => cached,
            None => {
                let labels: Vec<String> =
                    diagram.nodes.iter().map(|node| node.label.clone()).collect();
                let categories =
                    match tokio::time::timeout(self.timeout, self.classifier.classify(&labels))
                        .await
                    {
                        Ok(categories) => categories,
                        Err(_) => {
                            tracing::warn!(feature = feature_id, "diagram classification timed out");
                            default_categories(&labels)
                        }
                    };
                self.cache.insert(feature_id, &digest, categories.clone());
                categories
            }
        };
        for node in &mut diagram.nodes {
            node.category = categories.get(&node.label).copied().unwrap_or_default();
        }
    }

    pub async fn compose(&self, project: &Project, feature_id: &str) -> Result<PlanView> {
        let feature = project.feature(feature_id)?;
        let Some(plan) = read_optional(&feature.plan())? else {
            return Ok(PlanView::missing());
        };

        let research_decisions = read_optional(&feature.research())?
            .map(|research| parse_research_decisions(&research))
            .unwrap_or_default();
        let file_structure =
            parse_file_structure(&plan).map(|structure| annotate_existence(project, structure));

        let mut diagram = parse_ascii_diagram(&plan);
        if let Some(diagram) = diagram.as_mut() {
            self.classify(feature_id, &plan, diagram).await;
        }

        let tessl_tiles = read_optional(&project.tile_manifest())?
            .map(|manifest| parse_tile_manifest(&manifest))
            .unwrap_or_default();

        Ok(PlanView {
            tech_context: parse_tech_context(&plan),
            research_decisions,
            file_structure,
            diagram,
            tessl_tiles,
            exists: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DefaultClassifier;
    use crate::config::LayoutConfig;
    use async_trait::async_trait;
    use iikit_parser::NodeCategory;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const PLAN: &str = "# Plan

## Technical Context

**Language/Version**: Rust 1.85

## Architecture Overview

```
┌─────────┐
│ Browser │
└────┬────┘
     │
┌────┴────┐
│ Server  │
└─────────┘
```

## Project Structure

```
src/
├── main.rs
└── missing.rs
```
";

    struct CountingClassifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NodeClassifier for CountingClassifier {
        async fn classify(&self, labels: &[String]) -> HashMap<String, NodeCategory> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut categories = default_categories(labels);
            categories.insert("Browser".to_string(), NodeCategory::Client);
            categories
        }
    }

    struct SlowClassifier;

    #[async_trait]
    impl NodeClassifier for SlowClassifier {
        async fn classify(&self, labels: &[String]) -> HashMap<String, NodeCategory> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            labels
                .iter()
                .map(|label| (label.clone(), NodeCategory::Server))
                .collect()
        }
    }

    fn project() -> (TempDir, Project) {
        let temp = TempDir::new().unwrap();
        let feature = temp.path().join("specs/001-auth");
        std::fs::create_dir_all(&feature).unwrap();
        std::fs::write(feature.join("plan.md"), PLAN).unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/main.rs"), "fn main() {}").unwrap();
        let project = Project::new(temp.path(), LayoutConfig::default());
        (temp, project)
    }

    #[tokio::test]
    async fn annotates_entries_and_caches_classification() {
        let (_temp, project) = project();
        let classifier = Arc::new(CountingClassifier {
            calls: AtomicUsize::new(0),
        });
        let composer = PlanViewComposer::new(classifier.clone(), Duration::from_secs(5));

        let view = composer.compose(&project, "001-auth").await.unwrap();
        assert!(view.exists);
        let entries: Vec<(&str, bool)> = view
            .file_structure
            .as_ref()
            .unwrap()
            .entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.exists))
            .collect();
        assert_eq!(
            entries,
            vec![("src", true), ("main.rs", true), ("missing.rs", false)]
        );
        let diagram = view.diagram.unwrap();
        assert_eq!(diagram.nodes[0].category, NodeCategory::Client);
        assert_eq!(diagram.nodes[1].category, NodeCategory::Default);

        composer.compose(&project, "001-auth").await.unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

        composer.invalidate("001-auth");
        composer.compose(&project, "001-auth").await.unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_classifier_falls_back_to_default() {
        let (_temp, project) = project();
        let composer = PlanViewComposer::new(Arc::new(SlowClassifier), Duration::from_secs(5));
        let view = composer.compose(&project, "001-auth").await.unwrap();
        let diagram = view.diagram.unwrap();
        assert!(
            diagram
                .nodes
                .iter()
                .all(|node| node.category == NodeCategory::Default)
        );
    }

    #[tokio::test]
    async fn missing_plan_is_an_empty_view() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("specs/002-empty")).unwrap();
        let project = Project::new(temp.path(), LayoutConfig::default());
        let composer = PlanViewComposer::new(Arc::new(DefaultClassifier), Duration::from_secs(5));
        let view = composer.compose(&project, "002-empty").await.unwrap();
        assert_eq!(view, PlanView::missing());
    }
}
