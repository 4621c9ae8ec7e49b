//! Checklist parsing (`checklists/*.md`).

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

use crate::section::{heading_level, is_fence, pattern};

/// The generic spec-quality checklist. On its own it does not start the
/// checklist phase.
pub const SPEC_QUALITY_CHECKLIST: &str = "requirements.md";

static ITEM_LINE: Lazy<Regex> = Lazy::new(|| pattern(r"^\s*[-*] \[([ xX])\]\s+(.*)$"));
static ITEM_ID: Lazy<Regex> = Lazy::new(|| pattern(r"^\**(CHK-\d+)\**:?\s+"));
static TRAILING_TAG: Lazy<Regex> = Lazy::new(|| pattern(r"\s*\[([^\[\]]+)\]\s*$"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub id: Option<String>,
    pub text: String,
    pub checked: bool,
    pub tags: Vec<String>,
    /// Nearest preceding `##`/`###` heading.
    pub category: Option<String>,
}

/// Whether a checklist file counts towards the checklist phase.
pub fn is_domain_checklist(filename: &str) -> bool {
    filename.ends_with(".md") && filename != SPEC_QUALITY_CHECKLIST
}

fn split_tags(rest: &str) -> (String, Vec<String>) {
    let mut text = rest.trim_end();
    let mut tags = Vec::new();
    while let Some(caps) = TRAILING_TAG.captures(text) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        if whole.start() == 0 {
            break;
        }
        tags.push(caps[1].trim().to_string());
        text = text[..whole.start()].trim_end();
    }
    tags.reverse();
    (text.to_string(), tags)
}

/// Parse every checkbox item of one checklist file.
pub fn parse_checklist(content: &str) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    let mut category: Option<String> = None;
    let mut in_fence = false;

    for line in content.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some((level, title)) = heading_level(line) {
            if level == 2 || level == 3 {
                category = Some(title.to_string());
            }
            continue;
        }
        let Some(caps) = ITEM_LINE.captures(line) else {
            continue;
        };
        let mut rest = caps[2].trim();
        let mut id = None;
        if let Some(id_caps) = ITEM_ID.captures(rest) {
            id = Some(id_caps[1].to_string());
            rest = &rest[id_caps[0].len()..];
        }
        let (text, tags) = split_tags(rest);
        items.push(ChecklistItem {
            id,
            text,
            checked: !caps[1].trim().is_empty(),
            tags,
            category: category.clone(),
        });
    }
    items
}
