//! tests/test-specs.md parsing.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

use crate::section::{bold_field, headings, pattern, span_end};

static SPEC_HEADING: Lazy<Regex> = Lazy::new(|| pattern(r"^(TS-\d+):\s*(.+)$"));
static REQUIREMENT_ID: Lazy<Regex> = Lazy::new(|| pattern(r"^(?:FR|SC)-\d+$"));

/// Pyramid tier of a test specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    #[default]
    Acceptance,
    Contract,
    Validation,
}

impl TestType {
    pub const fn as_str(self) -> &'static str {
        match self {
            TestType::Acceptance => "acceptance",
            TestType::Contract => "contract",
            TestType::Validation => "validation",
        }
    }

    pub fn all() -> &'static [TestType] {
        &[TestType::Acceptance, TestType::Contract, TestType::Validation]
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "contract" => TestType::Contract,
            "validation" => TestType::Validation,
            _ => TestType::Acceptance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSpec {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub priority: Option<String>,
    /// Requirement and success-criterion ids only.
    pub traceability: Vec<String>,
}

fn traceability(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| REQUIREMENT_ID.is_match(token))
        .map(str::to_string)
        .collect()
}

/// Parse every `### TS-NNN: Title` block.
pub fn parse_test_specs(content: &str) -> Vec<TestSpec> {
    let lines: Vec<&str> = content.lines().collect();
    let mut specs = Vec::new();

    for heading in headings(&lines) {
        let Some(caps) = SPEC_HEADING.captures(heading.title) else {
            continue;
        };
        let end = span_end(&lines, &heading, heading.level.max(3));
        let mut spec = TestSpec {
            id: caps[1].to_string(),
            title: caps[2].trim().to_string(),
            test_type: TestType::default(),
            priority: None,
            traceability: Vec::new(),
        };
        for line in &lines[heading.line + 1..end] {
            if let Some(value) = bold_field(line, "Type") {
                spec.test_type = TestType::parse(value);
            } else if let Some(value) = bold_field(line, "Priority") {
                spec.priority = (!value.is_empty()).then(|| value.to_string());
            } else if let Some(value) = bold_field(line, "Traceability") {
                spec.traceability = traceability(value);
            }
        }
        specs.push(spec);
    }
    specs
}
