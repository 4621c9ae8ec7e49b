//! analysis.md parsing.
//!
//! The consistency-analysis report is produced elsewhere; this module only
//! reads its tables back: findings, per-requirement coverage, constitution
//! alignment, phase-separation violations and the metrics block.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

use crate::section::{Table, first_table, pattern, section};

static PERCENT: Lazy<Regex> = Lazy::new(|| pattern(r"(\d+(?:\.\d+)?)\s*%"));
static RATIO: Lazy<Regex> = Lazy::new(|| pattern(r"(\d+)\s*/\s*(\d+)"));
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| pattern(r"^\s*(\d+)"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub id: String,
    pub category: String,
    pub severity: String,
    pub location: String,
    pub summary: String,
    pub recommendation: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Covered,
    Partial,
    Missing,
    /// The report has no column for this dimension.
    Na,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageCell {
    pub status: CoverageStatus,
    pub refs: Vec<String>,
}

impl CoverageCell {
    fn not_reported() -> Self {
        Self {
            status: CoverageStatus::Na,
            refs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageRow {
    pub requirement: String,
    pub tasks: CoverageCell,
    pub tests: CoverageCell,
    pub plan: CoverageCell,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentRow {
    pub principle: String,
    pub status: String,
    pub evidence: String,
}

impl AlignmentRow {
    pub fn is_aligned(&self) -> bool {
        self.status.eq_ignore_ascii_case("aligned")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_requirements: Option<u32>,
    pub total_tasks: Option<u32>,
    pub total_test_specs: Option<u32>,
    /// Percentage, 0-100.
    pub requirement_coverage: Option<f64>,
    /// Percentage, 0-100.
    pub test_coverage: Option<f64>,
    pub critical_issues: Option<u32>,
    pub high_issues: Option<u32>,
    pub medium_issues: Option<u32>,
    pub low_issues: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub findings: Vec<Finding>,
    pub coverage: Vec<CoverageRow>,
    pub constitution_alignment: Vec<AlignmentRow>,
    pub phase_violations: usize,
    pub metrics: Option<Metrics>,
}

fn section_table(lines: &[&str], title_contains: &str) -> Option<Table> {
    let body = section(lines, |level, title| {
        level == 2 && title.contains(title_contains)
    })?;
    first_table(&body)
}

fn cell(row: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .cloned()
        .unwrap_or_default()
}

fn id_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && !matches!(*token, "—" | "–" | "-" | "N/A" | "n/a"))
        .map(str::to_string)
        .collect()
}

fn coverage_cell(row: &[String], has: Option<usize>, refs: Option<usize>) -> CoverageCell {
    let Some(has) = has else {
        return CoverageCell::not_reported();
    };
    let refs = id_list(&cell(row, refs));
    let status = match cell(row, Some(has)).to_ascii_lowercase().as_str() {
        "yes" => CoverageStatus::Covered,
        "partial" => CoverageStatus::Partial,
        "no" => CoverageStatus::Missing,
        _ if refs.is_empty() => CoverageStatus::Missing,
        _ => CoverageStatus::Covered,
    };
    CoverageCell { status, refs }
}

fn parse_findings(lines: &[&str]) -> Vec<Finding> {
    let Some(table) = section_table(lines, "Findings") else {
        return Vec::new();
    };
    let id = table.column("id").or(Some(0));
    let category = table.column("category");
    let severity = table.column("severity");
    let location = table.column("location");
    let summary = table.column("summary");
    let recommendation = table.column("recommendation");
    let status = table.column("status");

    table
        .rows
        .iter()
        .filter(|row| !cell(row, id).is_empty())
        .map(|row| {
            let state = cell(row, status).to_ascii_lowercase();
            Finding {
                id: cell(row, id),
                category: cell(row, category),
                severity: cell(row, severity).to_ascii_uppercase(),
                location: cell(row, location),
                summary: cell(row, summary),
                recommendation: cell(row, recommendation),
                resolved: state.contains("resolved") || state.contains("fixed"),
            }
        })
        .collect()
}

fn parse_coverage(lines: &[&str]) -> Vec<CoverageRow> {
    let Some(table) = section_table(lines, "Coverage") else {
        return Vec::new();
    };
    let has_task = table.column("has task");
    let task_ids = table.column("task id");
    let has_test = table.column("has test");
    let test_ids = table.column("test id");
    let has_plan = table.column("has plan");
    let plan_refs = table.column("plan ref");
    let status = table.column("status");

    table
        .rows
        .iter()
        .filter(|row| !cell(row, Some(0)).is_empty())
        .map(|row| CoverageRow {
            requirement: cell(row, Some(0)),
            tasks: coverage_cell(row, has_task, task_ids),
            tests: coverage_cell(row, has_test, test_ids),
            plan: coverage_cell(row, has_plan, plan_refs),
            status: cell(row, status),
        })
        .collect()
}

fn parse_alignment(lines: &[&str]) -> Vec<AlignmentRow> {
    let Some(table) = section_table(lines, "Constitution Alignment") else {
        return Vec::new();
    };
    let status = table.column("status");
    let evidence = table.column("evidence");
    table
        .rows
        .iter()
        .map(|row| AlignmentRow {
            principle: cell(row, Some(0)),
            status: cell(row, status).to_ascii_uppercase(),
            evidence: cell(row, evidence),
        })
        .collect()
}

fn parse_phase_violations(lines: &[&str]) -> usize {
    section_table(lines, "Phase Separation").map_or(0, |table| table.rows.len())
}

fn percentage(value: &str) -> Option<f64> {
    if let Some(caps) = PERCENT.captures(value) {
        return caps[1].parse().ok();
    }
    let caps = RATIO.captures(value)?;
    let done: f64 = caps[1].parse().ok()?;
    let total: f64 = caps[2].parse().ok()?;
    (total > 0.0).then_some(done / total * 100.0)
}

fn count(value: &str) -> Option<u32> {
    LEADING_NUMBER.captures(value)?[1].parse().ok()
}

fn parse_metrics(lines: &[&str]) -> Option<Metrics> {
    let table = section_table(lines, "Metrics")?;
    let mut metrics = Metrics::default();
    for row in &table.rows {
        let label = cell(row, Some(0)).to_ascii_lowercase();
        let value = cell(row, Some(1));
        if label.starts_with("total requirements") {
            metrics.total_requirements = count(&value);
        } else if label.starts_with("total tasks") {
            metrics.total_tasks = count(&value);
        } else if label.starts_with("total test spec") {
            metrics.total_test_specs = count(&value);
        } else if label.starts_with("requirement coverage") {
            metrics.requirement_coverage = percentage(&value);
        } else if label.starts_with("test coverage") {
            metrics.test_coverage = percentage(&value);
        } else if label.starts_with("critical") {
            metrics.critical_issues = count(&value);
        } else if label.starts_with("high") {
            metrics.high_issues = count(&value);
        } else if label.starts_with("medium") {
            metrics.medium_issues = count(&value);
        } else if label.starts_with("low") {
            metrics.low_issues = count(&value);
        }
    }
    Some(metrics)
}

/// Parse every table of the report. Absent sections read as empty.
pub fn parse_analysis(content: &str) -> AnalysisReport {
    let lines: Vec<&str> = content.lines().collect();
    AnalysisReport {
        findings: parse_findings(&lines),
        coverage: parse_coverage(&lines),
        constitution_alignment: parse_alignment(&lines),
        phase_violations: parse_phase_violations(&lines),
        metrics: parse_metrics(&lines),
    }
}
