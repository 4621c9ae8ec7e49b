//! tasks.md parsing.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

use crate::section::pattern;

static TASK_LINE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"^\s*[-*] \[([ xX])\] (T\d+)\s+(?:\[P\]\s*)?(?:\[(US\d+)\]\s*)?(.*)$")
});
static MUST_PASS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)must pass\s+(TS-\d+(?:\s*(?:,|and)\s*TS-\d+)*)"));
static TS_ID: Lazy<Regex> = Lazy::new(|| pattern(r"TS-\d+"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Story this task is tagged with (`US<N>`), if any.
    pub story_tag: Option<String>,
    pub description: String,
    pub checked: bool,
}

/// Parse checkbox task lines. A repeated task id keeps its first occurrence.
pub fn parse_tasks(content: &str) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::new();
    for line in content.lines() {
        let Some(caps) = TASK_LINE.captures(line) else {
            continue;
        };
        let id = &caps[2];
        if tasks.iter().any(|task| task.id == id) {
            tracing::debug!(task = id, "duplicate task id ignored");
            continue;
        }
        tasks.push(Task {
            id: id.to_string(),
            story_tag: caps.get(3).map(|tag| tag.as_str().to_string()),
            description: caps[4].trim().to_string(),
            checked: !caps[1].trim().is_empty(),
        });
    }
    tasks
}

/// Test-spec ids named by `must pass TS-001, TS-002` inside a task description.
pub fn test_refs(description: &str) -> Vec<String> {
    MUST_PASS
        .captures_iter(description)
        .flat_map(|caps| {
            TS_ID
                .find_iter(&caps[1])
                .map(|id| id.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}
