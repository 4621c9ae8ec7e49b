//! Markdown artifact parsers for the IIKit dashboard
//!
//! Each parser turns the raw text of one workflow document (spec.md,
//! tasks.md, plan.md, research.md, CONSTITUTION.md, checklists,
//! test-specs.md, analysis.md) into typed records. Parsers are pure: they
//! never touch the filesystem and they degrade to empty results instead of
//! failing on malformed input.
//!
//! The [`integrity`] module hashes the Given/When/Then assertions of a
//! test-specification document so that silent edits can be detected.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod analysis;
pub mod checklist;
pub mod constitution;
pub mod diagram;
pub mod integrity;
pub mod manifest;
pub mod plan;
pub mod spec;
pub mod tasks;
pub mod testspec;

mod section;

pub use analysis::{
    AlignmentRow, AnalysisReport, CoverageCell, CoverageRow, CoverageStatus, Finding, Metrics,
    parse_analysis,
};
pub use checklist::{ChecklistItem, is_domain_checklist, parse_checklist};
pub use constitution::{
    Constitution, ConstitutionPrinciple, ObligationLevel, VersionMetadata, parse_constitution,
};
pub use diagram::{Diagram, DiagramEdge, DiagramNode, NodeCategory, parse_ascii_diagram};
pub use integrity::{IntegrityCheck, IntegrityStatus, check_integrity, compute_assertion_hash};
pub use manifest::{TesslTile, parse_tile_manifest};
pub use plan::{
    EntryKind, FileStructure, FileStructureEntry, ResearchDecision, TechContextEntry,
    parse_file_structure, parse_research_decisions, parse_tech_context,
};
pub use spec::{
    Clarification, Requirement, SuccessCriterion, UserStory, parse_clarifications,
    parse_requirements, parse_spec_stories, parse_success_criteria,
};
pub use tasks::{Task, parse_tasks, test_refs};
pub use testspec::{TestSpec, TestType, parse_test_specs};
