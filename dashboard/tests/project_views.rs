#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use iikit_dashboard::classifier::DefaultClassifier;
use iikit_dashboard::config::LayoutConfig;
use iikit_dashboard::views::analyze::HealthZone;
use iikit_dashboard::views::checklist::{GateLevel, GateStatus};
use iikit_dashboard::views::pipeline::{PhaseId, PhaseStatus};
use iikit_dashboard::{Dashboard, DashboardError, Query, ServerMessage, ViewKind};
use iikit_parser::{CoverageStatus, IntegrityStatus, compute_assertion_hash};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

const SPEC: &str = "# Feature Specification: Authentication

### User Story 1 - Sign in (Priority: P1)

Users sign in with email. FR-001

---

### User Story 2 - Reset password (Priority: P2)

Users recover access. FR-002

---

### User Story 3 - Social login (Priority: P3)

Third-party sign in.

## Requirements

- **FR-001**: System MUST authenticate users via email
- **FR-002**: System MUST support password reset
";

const TASKS: &str = "# Tasks

- [x] T001 [US1] Build sign-in form (must pass TS-001)
- [x] T002 [US1] Wire session cookie
- [ ] T003 [US2] Reset email template
- [ ] T004 [US2] Reset token endpoint
- [ ] T005 [US3] GitHub OAuth callback
";

const TEST_SPECS: &str = "# Test Specifications

### TS-001: Sign in lands on board

**Type**: acceptance
**Traceability**: FR-001

**Given**: a registered user
**When**: they submit valid credentials
**Then**: they land on the board
";

const CONSTITUTION: &str = "# Constitution

## Core Principles

### I. Test-First

Every feature MUST start with failing tests.

### II. Observability

Services SHOULD emit structured logs.

### III. Simplicity

Prefer the smallest design that works.

## Governance

**Version**: 2.0.0 | **Ratified**: 2026-01-05 | **Last Amended**: 2026-03-01
";

const ANALYSIS: &str = "# Specification Analysis Report

## Findings

| ID | Category | Severity | Location(s) | Summary | Recommendation |
|----|----------|----------|-------------|---------|----------------|
| A1 | Coverage Gap | HIGH | spec.md:FR-002 | FR-002 has no test | Add a test spec |

## Coverage Summary

| Requirement | Has Task? | Task IDs | Has Test? | Test IDs | Has Plan? | Plan Refs | Status |
|-------------|-----------|----------|-----------|----------|-----------|-----------|--------|
| FR-001 | Yes | T001, T002 | Yes | TS-001 | Yes | KDD-1 | Full |
| FR-002 | No | — | No | — | No | — | Missing |

## Constitution Alignment

| Principle | Status | Evidence |
|-----------|--------|----------|
| I. Test-First | ALIGNED | TS-001 precedes T001 |
";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project() -> (TempDir, Dashboard) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "CONSTITUTION.md", CONSTITUTION);
    write(root, "specs/001-auth/spec.md", SPEC);
    write(root, "specs/001-auth/tasks.md", TASKS);
    write(root, "specs/002-search/spec.md", "# Search\n");
    std::fs::create_dir_all(root.join("specs/notes")).unwrap();

    let dashboard = Dashboard::with_classifier(
        root,
        LayoutConfig::default(),
        Arc::new(DefaultClassifier),
        Duration::from_secs(1),
    );
    (temp, dashboard)
}

fn card_ids(cards: &[iikit_dashboard::views::board::StoryCard]) -> Vec<&str> {
    cards.iter().map(|card| card.id.as_str()).collect()
}

#[test]
fn board_buckets_stories_by_task_progress() {
    let (_temp, dashboard) = project();

    let board = dashboard.board("001-auth").unwrap();

    assert_eq!(card_ids(&board.columns.done), vec!["US1"]);
    assert_eq!(card_ids(&board.columns.todo), vec!["US2", "US3"]);
    assert!(board.columns.in_progress.is_empty());
    assert_eq!(board.columns.done[0].progress, "2/2");
    assert_eq!(board.columns.todo[0].progress, "0/2");
    assert_eq!(board.integrity.status, IntegrityStatus::Missing);
}

#[tokio::test]
async fn unknown_feature_is_not_found_everywhere() {
    let (_temp, dashboard) = project();
    let id = "999-missing";

    assert!(dashboard.board(id).unwrap_err().is_not_found());
    assert!(dashboard.pipeline(id).unwrap_err().is_not_found());
    assert!(dashboard.story_map(id).unwrap_err().is_not_found());
    assert!(dashboard.plan_view(id).await.unwrap_err().is_not_found());
    assert!(dashboard.checklist(id).unwrap_err().is_not_found());
    assert!(dashboard.testify(id).unwrap_err().is_not_found());
    assert!(dashboard.analyze(id).unwrap_err().is_not_found());

    assert!(dashboard.board("../specs").unwrap_err().is_not_found());
}

#[tokio::test]
async fn missing_plan_yields_empty_plan_view() {
    let (_temp, dashboard) = project();

    let value = dashboard
        .query(&Query {
            view: ViewKind::Planview,
            feature: Some("001-auth".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(
        value,
        json!({
            "techContext": [],
            "researchDecisions": [],
            "fileStructure": null,
            "diagram": null,
            "tesslTiles": [],
            "exists": false,
        })
    );
}

#[test]
fn features_listed_newest_first() {
    let (_temp, dashboard) = project();

    let features = dashboard.features().unwrap();

    let ids: Vec<&str> = features.iter().map(|feature| feature.id.as_str()).collect();
    assert_eq!(ids, vec!["002-search", "001-auth"]);
    assert_eq!(features[0].name, "Search");
    assert_eq!(features[1].stories, 3);
    assert_eq!(features[1].progress, "2/5");
}

#[test]
fn constitution_levels_default_to_should() {
    let (_temp, dashboard) = project();

    let constitution = dashboard.constitution().unwrap();

    assert!(constitution.exists);
    let levels: Vec<&str> = constitution
        .principles
        .iter()
        .map(|principle| principle.level.as_str())
        .collect();
    assert_eq!(levels, vec!["MUST", "SHOULD", "SHOULD"]);
    assert_eq!(constitution.version.unwrap().version, "2.0.0");
}

#[test]
fn checklist_gate_waits_for_a_domain_checklist() {
    let (temp, dashboard) = project();
    write(
        temp.path(),
        "specs/001-auth/checklists/requirements.md",
        "- [x] Spec reviewed\n",
    );

    let view = dashboard.checklist("001-auth").unwrap();
    assert!(view.files.is_empty());
    assert_eq!(view.gate.status, GateStatus::Blocked);

    write(
        temp.path(),
        "specs/001-auth/checklists/security.md",
        "- [x] Passwords hashed\n- [ ] Rate limiting\n- [ ] Lockout\n",
    );

    let view = dashboard.checklist("001-auth").unwrap();
    let names: Vec<&str> = view.files.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(names, vec!["Requirements", "Security"]);
    assert_eq!(view.gate.level, GateLevel::Yellow);
    assert_eq!(view.gate.label, "GATE: BLOCKED");
}

#[test]
fn pipeline_reflects_artifacts_on_disk() {
    let (_temp, dashboard) = project();

    let pipeline = dashboard.pipeline("001-auth").unwrap();

    let status_of = |id: PhaseId| {
        pipeline
            .phases
            .iter()
            .find(|phase| phase.id == id)
            .map(|phase| (phase.status, phase.progress.clone()))
            .unwrap()
    };
    assert_eq!(pipeline.phases.len(), 9);
    assert_eq!(status_of(PhaseId::Constitution).0, PhaseStatus::Complete);
    assert_eq!(status_of(PhaseId::Spec).0, PhaseStatus::Complete);
    assert_eq!(status_of(PhaseId::Plan).0, PhaseStatus::NotStarted);
    assert_eq!(status_of(PhaseId::Checklist).0, PhaseStatus::NotStarted);
    assert_eq!(
        status_of(PhaseId::Implement),
        (PhaseStatus::InProgress, Some("40%".to_string()))
    );
}

#[test]
fn testify_surfaces_tampered_assertions() {
    let (temp, dashboard) = project();
    write(temp.path(), "specs/001-auth/tests/test-specs.md", TEST_SPECS);
    let recorded = compute_assertion_hash(Some(TEST_SPECS)).unwrap();
    write(
        temp.path(),
        "specs/001-auth/context.json",
        &json!({"testify": {"assertion_hash": recorded}}).to_string(),
    );

    let view = dashboard.testify("001-auth").unwrap();
    assert!(view.exists);
    assert_eq!(view.integrity.status, IntegrityStatus::Valid);
    assert_eq!(view.gaps.untested_requirements, vec!["FR-002"]);

    write(
        temp.path(),
        "specs/001-auth/tests/test-specs.md",
        &TEST_SPECS.replace("they land on the board", "they may land somewhere"),
    );

    let view = dashboard.testify("001-auth").unwrap();
    assert_eq!(view.integrity.status, IntegrityStatus::Tampered);
    let board = dashboard.board("001-auth").unwrap();
    assert_eq!(board.integrity.status, IntegrityStatus::Tampered);
}

#[tokio::test]
async fn query_json_routes_by_view_name() {
    let (_temp, dashboard) = project();

    let features = dashboard
        .query_json(&json!({"view": "features"}))
        .await
        .unwrap();
    assert_eq!(features.as_array().unwrap().len(), 2);

    let board = dashboard
        .query_json(&json!({"view": "board", "feature": "001-auth"}))
        .await
        .unwrap();
    assert_eq!(board["done"][0]["id"], "US1");
    assert_eq!(board["integrity"]["status"], "missing");

    let err = dashboard
        .query_json(&json!({"view": "kanban"}))
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::UnknownView(ref view) if view == "kanban"));

    let err = dashboard
        .query_json(&json!({"view": "board"}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn feature_updates_cover_every_per_feature_view() {
    let (_temp, dashboard) = project();

    let kinds: Vec<&str> = dashboard
        .feature_updates("001-auth")
        .await
        .iter()
        .map(ServerMessage::kind)
        .collect();

    assert_eq!(
        kinds,
        vec![
            "board_update",
            "pipeline_update",
            "storymap_update",
            "planview_update",
            "checklist_update",
            "testify_update",
            "analyze_update",
        ]
    );
    assert!(dashboard.feature_updates("999-missing").await.is_empty());
}

#[tokio::test]
async fn missing_analysis_yields_empty_analyze_view() {
    let (_temp, dashboard) = project();

    let value = dashboard
        .query(&Query {
            view: ViewKind::Analyze,
            feature: Some("001-auth".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(
        value,
        json!({
            "healthScore": null,
            "heatmap": {"columns": [], "rows": []},
            "issues": [],
            "metrics": null,
            "constitutionAlignment": [],
            "exists": false,
        })
    );
}

#[test]
fn analyze_scores_report_and_labels_heatmap_rows() {
    let (temp, dashboard) = project();
    write(temp.path(), "specs/001-auth/analysis.md", ANALYSIS);

    let view = dashboard.analyze("001-auth").unwrap();

    assert!(view.exists);
    let health = view.health_score.unwrap();
    // 0.3 * 50 + 0.2 * 100 + 0.2 * 100 + 0.3 * 50 = 70, minus 5 for the open HIGH finding.
    assert_eq!(health.score, 65);
    assert_eq!(health.zone, HealthZone::Warning);
    assert_eq!(health.factors.requirements_coverage.value, 50.0);

    assert_eq!(view.heatmap.columns, vec!["tasks", "tests", "plan"]);
    let rows: Vec<(&str, &str, CoverageStatus)> = view
        .heatmap
        .rows
        .iter()
        .map(|row| (row.id.as_str(), row.text.as_str(), row.cells.tests.status))
        .collect();
    assert_eq!(
        rows,
        vec![
            (
                "FR-001",
                "System MUST authenticate users via email",
                CoverageStatus::Covered
            ),
            (
                "FR-002",
                "System MUST support password reset",
                CoverageStatus::Missing
            ),
        ]
    );
    assert_eq!(view.heatmap.rows[0].cells.tasks.refs, vec!["T001", "T002"]);
    assert_eq!(view.issues.len(), 1);
    assert_eq!(view.constitution_alignment.len(), 1);
}

#[tokio::test]
async fn missing_spec_yields_empty_story_map() {
    let (temp, dashboard) = project();
    std::fs::create_dir_all(temp.path().join("specs/003-draft")).unwrap();

    let value = dashboard
        .query(&Query {
            view: ViewKind::Storymap,
            feature: Some("003-draft".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(
        value,
        json!({
            "stories": [],
            "requirements": [],
            "successCriteria": [],
            "clarifications": [],
            "edges": [],
            "exists": false,
        })
    );

    let map = dashboard.story_map("001-auth").unwrap();
    assert!(map.exists);
    let edges: Vec<(&str, &str)> = map
        .edges
        .iter()
        .map(|edge| (edge.from.as_str(), edge.to.as_str()))
        .collect();
    assert_eq!(edges, vec![("US1", "FR-001"), ("US2", "FR-002")]);
}

#[test]
fn invalid_utf8_degrades_instead_of_failing() {
    let (temp, dashboard) = project();
    std::fs::write(
        temp.path().join("specs/002-search/spec.md"),
        b"### User Story 1 - Caf\xE9 login (Priority: P1)\n\nBrowse the menu.\n",
    )
    .unwrap();

    let features = dashboard.features().unwrap();
    assert_eq!(features[0].id, "002-search");
    assert_eq!(features[0].stories, 1);

    let board = dashboard.board("002-search").unwrap();
    assert_eq!(board.columns.todo[0].title, "Caf\u{FFFD} login");
    assert!(dashboard.story_map("002-search").unwrap().exists);
}

#[test]
fn blank_recorded_hash_reads_as_missing() {
    let (temp, dashboard) = project();
    write(temp.path(), "specs/001-auth/tests/test-specs.md", TEST_SPECS);
    write(
        temp.path(),
        "specs/001-auth/context.json",
        r#"{"testify": {"assertion_hash": ""}}"#,
    );

    let view = dashboard.testify("001-auth").unwrap();

    assert_eq!(view.integrity.status, IntegrityStatus::Missing);
    assert_eq!(view.integrity.stored_hash, None);
    assert!(view.integrity.current_hash.is_some());
}
