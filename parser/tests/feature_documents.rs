#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Parses a complete feature folder's documents together and checks that
//! the cross-references between them line up.

use std::collections::HashSet;

use iikit_parser::{
    EntryKind, IntegrityStatus, TestType, check_integrity, compute_assertion_hash,
    parse_analysis, parse_ascii_diagram, parse_checklist, parse_clarifications,
    parse_constitution, parse_file_structure, parse_requirements, parse_research_decisions,
    parse_spec_stories, parse_success_criteria, parse_tasks, parse_tech_context,
    parse_test_specs, parse_tile_manifest,
};
use pretty_assertions::assert_eq;

const SPEC: &str = "# Feature Specification: Authentication

### User Story 1 - Sign in (Priority: P1)

Registered users sign in with email. FR-001

**Acceptance Scenarios**:

1. **Given** a registered user, **When** they sign in, **Then** they land on the board

---

### User Story 2 - Reset password (Priority: P2)

Users recover access. FR-002

---

### User Story 3 - Social login (Priority: P3)

Sign in through a third party.

## Requirements

- **FR-001**: System MUST authenticate users via email
- **FR-002**: System MUST support password reset
- **FR-003**: System SHOULD support social providers

## Success Criteria

- **SC-001**: Sign in completes in under 3 seconds

## Clarifications

### Session 2026-03-02

- Q: Which providers? -> A: GitHub only [FR-003, US3]
";

const TASKS: &str = "# Tasks

## Phase 1: Sign in
- [x] T001 [US1] Build sign-in form (must pass TS-001)
- [x] T002 [US1] Wire session cookie

## Phase 2: Reset
- [ ] T003 [US2] Reset email template
- [ ] T004 [P] [US2] Reset token endpoint (must pass TS-002)

## Phase 3: Social
- [ ] T005 [US3] GitHub OAuth callback
";

const TEST_SPECS: &str = "# Test Specifications

### TS-001: Sign in lands on board

**Type**: acceptance
**Priority**: P1
**Traceability**: FR-001, SC-001

**Given**: a registered user
**When**: they submit valid credentials
**Then**: they land on the board

### TS-002: Reset token contract

**Type**: contract
**Traceability**: FR-002

**Given**: a reset request
**When**: the token endpoint is called
**Then**: a single-use token is returned
";

const PLAN: &str = "# Implementation Plan

## Technical Context

**Language/Version**: Rust 2024
**Testing**: cargo test

## Architecture Overview

```
┌─────────┐
│ Browser │
│ (SPA)   │
└────┬────┘
     │ WebSocket
     ▼
┌─────────┐
│ Server  │
└─────────┘
```

## Project Structure

```
src/
├── server.rs   # HTTP entry point
└── session.rs
tests/
└── auth.rs
```
";

#[test]
fn task_tags_and_story_ids_agree() {
    let stories = parse_spec_stories(SPEC);
    let ids: Vec<&str> = stories.iter().map(|story| story.id.as_str()).collect();
    assert_eq!(ids, vec!["US1", "US2", "US3"]);

    let tasks = parse_tasks(TASKS);
    assert_eq!(tasks.len(), 5);
    let story_ids: HashSet<&str> = ids.into_iter().collect();
    for task in &tasks {
        let tag = task.story_tag.as_deref().unwrap();
        assert!(story_ids.contains(tag), "{} tagged {tag}", task.id);
    }

    let signed_in: Vec<bool> = tasks
        .iter()
        .filter(|task| task.story_tag.as_deref() == Some("US1"))
        .map(|task| task.checked)
        .collect();
    assert_eq!(signed_in, vec![true, true]);
}

#[test]
fn requirement_references_resolve() {
    let requirements = parse_requirements(SPEC);
    let declared: HashSet<&str> = requirements.iter().map(|req| req.id.as_str()).collect();
    assert_eq!(declared.len(), 3);
    assert_eq!(parse_success_criteria(SPEC).len(), 1);

    for spec in parse_test_specs(TEST_SPECS) {
        for reference in spec.traceability.iter().filter(|r| r.starts_with("FR-")) {
            assert!(declared.contains(reference.as_str()), "{reference}");
        }
    }

    let clarifications = parse_clarifications(SPEC);
    assert_eq!(clarifications.len(), 1);
    assert_eq!(clarifications[0].refs, vec!["FR-003", "US3"]);
}

#[test]
fn must_pass_references_name_declared_test_specs() {
    let specs = parse_test_specs(TEST_SPECS);
    assert_eq!(specs[0].test_type, TestType::Acceptance);
    assert_eq!(specs[1].test_type, TestType::Contract);

    let declared: HashSet<&str> = specs.iter().map(|spec| spec.id.as_str()).collect();
    let referenced: Vec<String> = parse_tasks(TASKS)
        .iter()
        .flat_map(|task| iikit_parser::test_refs(&task.description))
        .collect();
    assert_eq!(referenced, vec!["TS-001", "TS-002"]);
    assert!(referenced.iter().all(|id| declared.contains(id.as_str())));
}

#[test]
fn integrity_tracks_assertion_edits_only() {
    let stored = compute_assertion_hash(Some(TEST_SPECS)).unwrap();

    let retitled = TEST_SPECS.replace("Reset token contract", "Token endpoint contract");
    let current = compute_assertion_hash(Some(&retitled));
    assert_eq!(
        check_integrity(current.as_deref(), Some(&stored)).status,
        IntegrityStatus::Valid
    );

    let weakened = TEST_SPECS.replace("a single-use token", "a token");
    let current = compute_assertion_hash(Some(&weakened));
    let check = check_integrity(current.as_deref(), Some(&stored));
    assert_eq!(check.status, IntegrityStatus::Tampered);
    assert_eq!(check.stored_hash.as_deref(), Some(stored.as_str()));

    assert_eq!(
        check_integrity(None, Some(&stored)).status,
        IntegrityStatus::Missing
    );
}

#[test]
fn plan_sections_parse_independently() {
    let context = parse_tech_context(PLAN);
    assert_eq!(context.len(), 2);
    assert_eq!(context[0].label, "Language/Version");

    let diagram = parse_ascii_diagram(PLAN).unwrap();
    assert_eq!(diagram.nodes.len(), 2);
    assert_eq!(diagram.edges.len(), 1);
    assert_eq!(diagram.edges[0].label.as_deref(), Some("WebSocket"));

    let structure = parse_file_structure(PLAN).unwrap();
    let shape: Vec<(&str, EntryKind, usize)> = structure
        .entries
        .iter()
        .map(|entry| (entry.name.as_str(), entry.kind, entry.depth))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("src", EntryKind::Directory, 0),
            ("server.rs", EntryKind::File, 1),
            ("session.rs", EntryKind::File, 1),
            ("tests", EntryKind::Directory, 0),
            ("auth.rs", EntryKind::File, 1),
        ]
    );
    let paths: Vec<String> = (0..structure.entries.len())
        .filter_map(|index| structure.relative_path(index))
        .collect();
    assert_eq!(
        paths,
        vec![
            "src",
            "src/server.rs",
            "src/session.rs",
            "tests",
            "tests/auth.rs"
        ]
    );
}

#[test]
fn malformed_input_degrades_to_empty() {
    let garbage = "\u{0}\u{1}not markdown at all\n|||\n```\n┌──";
    assert!(parse_spec_stories(garbage).is_empty());
    assert!(parse_requirements(garbage).is_empty());
    assert!(parse_success_criteria(garbage).is_empty());
    assert!(parse_clarifications(garbage).is_empty());
    assert!(parse_tasks(garbage).is_empty());
    assert!(parse_checklist(garbage).is_empty());
    assert!(parse_test_specs(garbage).is_empty());
    assert!(parse_tech_context(garbage).is_empty());
    assert!(parse_research_decisions(garbage).is_empty());
    assert!(parse_tile_manifest(garbage).is_empty());
    assert_eq!(parse_file_structure(garbage), None);
    assert_eq!(parse_ascii_diagram(garbage), None);
    assert_eq!(compute_assertion_hash(Some(garbage)), None);
    assert!(parse_constitution(garbage).principles.is_empty());

    let report = parse_analysis(garbage);
    assert!(report.findings.is_empty());
    assert!(report.coverage.is_empty());
    assert_eq!(report.metrics, None);
}
