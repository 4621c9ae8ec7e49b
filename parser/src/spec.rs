//! spec.md parsing: user stories, requirements, success criteria and
//! clarification sessions.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

use crate::section::{Heading, headings, pattern, section, span_end};

static STORY_HEADING: Lazy<Regex> =
    Lazy::new(|| pattern(r"^User Story (\d+) - (.+?) \(Priority: (P\d+)\)"));
static SCENARIO: Lazy<Regex> = Lazy::new(|| pattern(r"^\s*\d+\.\s+\*\*Given\*\*"));
static REQUIREMENT_LINE: Lazy<Regex> =
    Lazy::new(|| pattern(r"^\s*[-*]\s+\*\*(FR-\d+)\*\*:\s*(.*)$"));
static CRITERION_LINE: Lazy<Regex> =
    Lazy::new(|| pattern(r"^\s*[-*]\s+\*\*(SC-\d+)\*\*:\s*(.*)$"));
static FR_REF: Lazy<Regex> = Lazy::new(|| pattern(r"\bFR-\d+\b"));
static SESSION_HEADING: Lazy<Regex> = Lazy::new(|| pattern(r"^Session (\d{4}-\d{2}-\d{2})"));
static QA_LINE: Lazy<Regex> =
    Lazy::new(|| pattern(r"^\s*[-*]\s+Q:\s*(.+?)\s*(?:->|→)\s*A:\s*(.*)$"));
static TRAILING_REFS: Lazy<Regex> = Lazy::new(|| pattern(r"\s*\[([^\[\]]*)\]\s*$"));
static TRACE_REF: Lazy<Regex> = Lazy::new(|| pattern(r"^(?:FR-\d+|SC-\d+|US\d+)$"));

/// A user story declared by a `### User Story N - Title (Priority: PN)` heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    /// `US<N>`, taken from the heading number.
    pub id: String,
    pub title: String,
    /// `P<N>`; lower numbers are more important.
    pub priority: String,
    pub scenario_count: usize,
    pub body: String,
    /// Requirement ids mentioned inside the story section, in first-seen order.
    #[serde(skip)]
    pub requirement_refs: Vec<String>,
}

impl UserStory {
    /// Numeric priority tier (`P2` → 2). Unparseable priorities sort last.
    pub fn tier(&self) -> u32 {
        self.priority
            .trim_start_matches('P')
            .parse()
            .unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessCriterion {
    pub id: String,
    pub text: String,
}

/// One Q/A pair recorded during a clarification session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clarification {
    /// Session date (`YYYY-MM-DD`), or empty when the pair precedes any session heading.
    pub session: String,
    pub question: String,
    pub answer: String,
    pub refs: Vec<String>,
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}

fn story_from(lines: &[&str], heading: &Heading<'_>) -> Option<UserStory> {
    let caps = STORY_HEADING.captures(heading.title)?;
    let end = span_end(lines, heading, 3);
    let span = &lines[heading.line + 1..end];
    let span = span
        .iter()
        .position(|line| is_separator(line))
        .map_or(span, |cut| &span[..cut]);

    let scenario_count = span.iter().filter(|line| SCENARIO.is_match(line)).count();
    let body = span.join("\n").trim().to_string();

    let mut requirement_refs: Vec<String> = Vec::new();
    for found in FR_REF.find_iter(&body) {
        let id = found.as_str().to_string();
        if !requirement_refs.contains(&id) {
            requirement_refs.push(id);
        }
    }

    Some(UserStory {
        id: format!("US{}", &caps[1]),
        title: caps[2].trim().to_string(),
        priority: caps[3].to_string(),
        scenario_count,
        body,
        requirement_refs,
    })
}

/// Parse every user story in document order.
pub fn parse_spec_stories(content: &str) -> Vec<UserStory> {
    let lines: Vec<&str> = content.lines().collect();
    headings(&lines)
        .iter()
        .filter(|h| h.level == 3)
        .filter_map(|h| story_from(&lines, h))
        .collect()
}

fn bold_id_lines(content: &str, line_re: &Regex) -> Vec<(String, String)> {
    let mut in_fence = false;
    let mut found = Vec::new();
    for line in content.lines() {
        if crate::section::is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = line_re.captures(line) {
            found.push((caps[1].to_string(), caps[2].trim().to_string()));
        }
    }
    found
}

/// Parse `- **FR-NNN**: text` lines.
pub fn parse_requirements(content: &str) -> Vec<Requirement> {
    bold_id_lines(content, &REQUIREMENT_LINE)
        .into_iter()
        .map(|(id, text)| Requirement { id, text })
        .collect()
}

/// Parse `- **SC-NNN**: text` lines.
pub fn parse_success_criteria(content: &str) -> Vec<SuccessCriterion> {
    bold_id_lines(content, &CRITERION_LINE)
        .into_iter()
        .map(|(id, text)| SuccessCriterion { id, text })
        .collect()
}

/// Split a trailing `[FR-001, US2]` list off an answer. The bracket is only
/// consumed when it names at least one requirement, criterion or story.
fn split_answer_refs(answer: &str) -> (String, Vec<String>) {
    let Some(caps) = TRAILING_REFS.captures(answer) else {
        return (answer.trim().to_string(), Vec::new());
    };
    let refs: Vec<String> = caps[1]
        .split(',')
        .map(str::trim)
        .filter(|token| TRACE_REF.is_match(token))
        .map(str::to_string)
        .collect();
    match caps.get(0) {
        Some(bracket) if !refs.is_empty() => (answer[..bracket.start()].trim().to_string(), refs),
        _ => (answer.trim().to_string(), Vec::new()),
    }
}

/// Parse Q/A pairs from the `## Clarifications` section.
pub fn parse_clarifications(content: &str) -> Vec<Clarification> {
    let lines: Vec<&str> = content.lines().collect();
    let Some(body) = section(&lines, |level, title| level == 2 && title == "Clarifications")
    else {
        return Vec::new();
    };

    let mut session = String::new();
    let mut clarifications = Vec::new();
    for line in body {
        if let Some((_, title)) = crate::section::heading_level(line) {
            if let Some(caps) = SESSION_HEADING.captures(title) {
                session = caps[1].to_string();
            }
            continue;
        }
        let Some(caps) = QA_LINE.captures(line) else {
            continue;
        };
        let (answer, refs) = split_answer_refs(&caps[2]);
        clarifications.push(Clarification {
            session: session.clone(),
            question: caps[1].trim().to_string(),
            answer,
            refs,
        });
    }
    clarifications
}
