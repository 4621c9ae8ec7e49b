//! Consistency analysis: health score, coverage heatmap and issues.

use std::collections::HashMap;

use iikit_parser::{
    AlignmentRow, AnalysisReport, CoverageCell, CoverageRow, CoverageStatus, Finding, Metrics,
    parse_analysis, parse_requirements, parse_success_criteria,
};
use serde::Serialize;

use crate::error::Result;
use crate::project::{Project, read_optional};

const WEIGHT_REQUIREMENTS: f64 = 0.3;
const WEIGHT_CONSTITUTION: f64 = 0.2;
const WEIGHT_PHASES: f64 = 0.2;
const WEIGHT_TESTS: f64 = 0.3;

/// Points lost per phase-separation violation.
const PHASE_VIOLATION_COST: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthZone {
    Healthy,
    Warning,
    Critical,
}

impl HealthZone {
    pub fn for_score(score: u32) -> Self {
        match score {
            80.. => HealthZone::Healthy,
            50.. => HealthZone::Warning,
            _ => HealthZone::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthFactor {
    pub value: f64,
    pub label: String,
}

impl HealthFactor {
    fn new(value: f64, label: &str) -> Self {
        Self {
            value: value.clamp(0.0, 100.0),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthFactors {
    pub requirements_coverage: HealthFactor,
    pub constitution_compliance: HealthFactor,
    pub phase_separation: HealthFactor,
    pub test_coverage: HealthFactor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthScore {
    pub score: u32,
    pub zone: HealthZone,
    pub factors: HealthFactors,
    /// No history is kept, so there is never a trend.
    pub trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapCells {
    pub tasks: CoverageCell,
    pub tests: CoverageCell,
    pub plan: CoverageCell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapRow {
    pub id: String,
    pub text: String,
    pub cells: HeatmapCells,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Heatmap {
    pub columns: Vec<String>,
    pub rows: Vec<HeatmapRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeView {
    pub health_score: Option<HealthScore>,
    pub heatmap: Heatmap,
    pub issues: Vec<Finding>,
    pub metrics: Option<Metrics>,
    pub constitution_alignment: Vec<AlignmentRow>,
    pub exists: bool,
}

impl AnalyzeView {
    fn missing() -> Self {
        Self {
            health_score: None,
            heatmap: Heatmap::default(),
            issues: Vec::new(),
            metrics: None,
            constitution_alignment: Vec::new(),
            exists: false,
        }
    }
}

fn severity_penalty(severity: &str) -> f64 {
    match severity {
        "CRITICAL" => 10.0,
        "HIGH" => 5.0,
        "MEDIUM" => 2.0,
        "LOW" => 1.0,
        _ => 0.0,
    }
}

/// Share of coverage rows whose cell is covered; partial counts half.
fn covered_share(rows: &[CoverageRow], cell: impl Fn(&CoverageRow) -> &CoverageCell) -> f64 {
    let scored: Vec<f64> = rows
        .iter()
        .filter_map(|row| match cell(row).status {
            CoverageStatus::Covered => Some(1.0),
            CoverageStatus::Partial => Some(0.5),
            CoverageStatus::Missing => Some(0.0),
            CoverageStatus::Na => None,
        })
        .collect();
    if scored.is_empty() {
        return 100.0;
    }
    scored.iter().sum::<f64>() * 100.0 / scored.len() as f64
}

/// Weighted factor mean minus penalties for unresolved findings, clamped to 0-100.
pub fn health_score(report: &AnalysisReport) -> HealthScore {
    let metrics = report.metrics.as_ref();
    let requirements = metrics
        .and_then(|metrics| metrics.requirement_coverage)
        .unwrap_or_else(|| covered_share(&report.coverage, |row| &row.tasks));
    let tests = metrics
        .and_then(|metrics| metrics.test_coverage)
        .unwrap_or_else(|| covered_share(&report.coverage, |row| &row.tests));
    let constitution = if report.constitution_alignment.is_empty() {
        100.0
    } else {
        let aligned = report
            .constitution_alignment
            .iter()
            .filter(|row| row.is_aligned())
            .count();
        aligned as f64 * 100.0 / report.constitution_alignment.len() as f64
    };
    let phases = 100.0 - PHASE_VIOLATION_COST * report.phase_violations as f64;

    let factors = HealthFactors {
        requirements_coverage: HealthFactor::new(requirements, "Requirements Coverage"),
        constitution_compliance: HealthFactor::new(constitution, "Constitution Compliance"),
        phase_separation: HealthFactor::new(phases, "Phase Separation"),
        test_coverage: HealthFactor::new(tests, "Test Coverage"),
    };

    let weighted = factors.requirements_coverage.value * WEIGHT_REQUIREMENTS
        + factors.constitution_compliance.value * WEIGHT_CONSTITUTION
        + factors.phase_separation.value * WEIGHT_PHASES
        + factors.test_coverage.value * WEIGHT_TESTS;
    let penalty: f64 = report
        .findings
        .iter()
        .filter(|finding| !finding.resolved)
        .map(|finding| severity_penalty(&finding.severity))
        .sum();
    let score = (weighted.round() - penalty).clamp(0.0, 100.0) as u32;

    HealthScore {
        score,
        zone: HealthZone::for_score(score),
        factors,
        trend: None,
    }
}

fn heatmap(report: &AnalysisReport, texts: &HashMap<String, String>) -> Heatmap {
    if report.coverage.is_empty() {
        return Heatmap::default();
    }
    let rows = report
        .coverage
        .iter()
        .map(|row| HeatmapRow {
            id: row.requirement.clone(),
            text: texts.get(&row.requirement).cloned().unwrap_or_default(),
            cells: HeatmapCells {
                tasks: row.tasks.clone(),
                tests: row.tests.clone(),
                plan: row.plan.clone(),
            },
        })
        .collect();
    Heatmap {
        columns: vec!["tasks".to_string(), "tests".to_string(), "plan".to_string()],
        rows,
    }
}

pub fn compose(project: &Project, feature_id: &str) -> Result<AnalyzeView> {
    let feature = project.feature(feature_id)?;
    let Some(analysis) = read_optional(&feature.analysis())? else {
        return Ok(AnalyzeView::missing());
    };
    let report = parse_analysis(&analysis);

    let spec = read_optional(&feature.spec())?.unwrap_or_default();
    let texts: HashMap<String, String> = parse_requirements(&spec)
        .into_iter()
        .map(|req| (req.id, req.text))
        .chain(
            parse_success_criteria(&spec)
                .into_iter()
                .map(|criterion| (criterion.id, criterion.text)),
        )
        .collect();

    Ok(AnalyzeView {
        health_score: Some(health_score(&report)),
        heatmap: heatmap(&report, &texts),
        issues: report.findings.clone(),
        metrics: report.metrics.clone(),
        constitution_alignment: report.constitution_alignment,
        exists: true,
    })
}
