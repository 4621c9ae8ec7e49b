//! CONSTITUTION.md parsing.
//!
//! Principles are `### <Roman>. <Name>` headings. The obligation level of a
//! principle is the strongest RFC-style keyword in its body.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

use crate::section::{bold_field, headings, pattern, span_end};

static PRINCIPLE_HEADING: Lazy<Regex> =
    Lazy::new(|| pattern(r"^([IVXLCDM]+)\.\s+(.+)$"));
static VERSION_FOOTER: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\*\*Version\*\*:\s*([^|]+?)\s*\|\s*\*\*Ratified\*\*:\s*([^|]+?)\s*\|\s*\*\*Last Amended\*\*:\s*(.+?)\s*$",
    )
});
static MUST: Lazy<Regex> = Lazy::new(|| pattern(r"\bMUST\b"));
static SHOULD: Lazy<Regex> = Lazy::new(|| pattern(r"\bSHOULD\b"));
static MAY: Lazy<Regex> = Lazy::new(|| pattern(r"\bMAY\b"));

/// Obligation strength of a principle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObligationLevel {
    May,
    Should,
    Must,
}

impl ObligationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            ObligationLevel::Must => "MUST",
            ObligationLevel::Should => "SHOULD",
            ObligationLevel::May => "MAY",
        }
    }

    /// Strongest keyword found in `text`; `Should` when none is present.
    pub fn resolve(text: &str) -> Self {
        if MUST.is_match(text) {
            ObligationLevel::Must
        } else if SHOULD.is_match(text) {
            ObligationLevel::Should
        } else if MAY.is_match(text) {
            ObligationLevel::May
        } else {
            ObligationLevel::Should
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstitutionPrinciple {
    /// Roman numeral as written in the heading.
    pub number: String,
    pub name: String,
    pub level: ObligationLevel,
    pub text: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    pub version: String,
    pub ratified: String,
    pub last_amended: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Constitution {
    pub principles: Vec<ConstitutionPrinciple>,
    pub version: Option<VersionMetadata>,
}

fn parse_version(lines: &[&str]) -> Option<VersionMetadata> {
    lines.iter().find_map(|line| {
        let caps = VERSION_FOOTER.captures(line)?;
        Some(VersionMetadata {
            version: caps[1].to_string(),
            ratified: caps[2].to_string(),
            last_amended: caps[3].to_string(),
        })
    })
}

/// Parse principles and the optional version footer.
pub fn parse_constitution(content: &str) -> Constitution {
    let lines: Vec<&str> = content.lines().collect();
    let mut principles = Vec::new();

    for heading in headings(&lines).iter().filter(|h| h.level == 3) {
        let Some(caps) = PRINCIPLE_HEADING.captures(heading.title) else {
            continue;
        };
        let end = span_end(&lines, heading, 3);
        let span = &lines[heading.line + 1..end];

        let mut rationale = String::new();
        let mut text_lines = Vec::new();
        for line in span {
            if let Some(value) = bold_field(line, "Rationale") {
                rationale = value.to_string();
            } else if !VERSION_FOOTER.is_match(line) {
                text_lines.push(*line);
            }
        }
        let text = text_lines.join("\n").trim().to_string();
        let level = ObligationLevel::resolve(&span.join("\n"));

        principles.push(ConstitutionPrinciple {
            number: caps[1].to_string(),
            name: caps[2].trim().to_string(),
            level,
            text,
            rationale,
        });
    }

    Constitution {
        principles,
        version: parse_version(&lines),
    }
}
