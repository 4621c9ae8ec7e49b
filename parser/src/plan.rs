//! plan.md and research.md parsing: technical context, the project file
//! tree, and research decisions.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

use crate::section::{bold_field, fenced_block_after, headings, pattern, section, span_end};

/// Conventional top-level directories. A first tree line naming one of these
/// is a real entry, anything else ending in `/` is taken as the project name.
const CONVENTIONAL_DIRS: &[&str] = &[
    "src", "lib", "test", "tests", "app", "bin", "docs", "scripts", "public", "pkg", "cmd",
    "internal", "specs", "config", "packages",
];

/// Display width of one tree level (`├── `, `│   `).
const LEVEL_WIDTH: usize = 4;

static CONTEXT_LINE: Lazy<Regex> = Lazy::new(|| pattern(r"^\*\*(.+?)\*\*:\s*(.+)$"));
static DECISION_HEADING: Lazy<Regex> = Lazy::new(|| pattern(r"^(\d+)\.\s+(.+)$"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechContextEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStructureEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub comment: Option<String>,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStructure {
    /// Project-name wrapper stripped from the first tree line.
    pub root_name: Option<String>,
    pub entries: Vec<FileStructureEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchDecision {
    pub title: String,
    pub decision: String,
    pub rationale: String,
}

/// Parse `**Label**: Value` lines of the `## Technical Context` section.
pub fn parse_tech_context(content: &str) -> Vec<TechContextEntry> {
    let lines: Vec<&str> = content.lines().collect();
    let Some(body) = section(&lines, |level, title| level == 2 && title == "Technical Context")
    else {
        return Vec::new();
    };
    body.iter()
        .filter_map(|line| CONTEXT_LINE.captures(line.trim()))
        .map(|caps| TechContextEntry {
            label: caps[1].trim().to_string(),
            value: caps[2].trim().to_string(),
        })
        .collect()
}

fn is_tree_glyph(c: char) -> bool {
    matches!(c, ' ' | '\t' | '│' | '├' | '└' | '─')
}

/// One tree line split into prefix width, connector presence and the entry text.
struct TreeLine<'a> {
    width: usize,
    connector: bool,
    rest: &'a str,
}

impl<'a> TreeLine<'a> {
    fn split(line: &'a str) -> Self {
        let prefix_bytes: usize = line
            .chars()
            .take_while(|c| is_tree_glyph(*c))
            .map(char::len_utf8)
            .sum();
        let prefix = &line[..prefix_bytes];
        Self {
            width: prefix.chars().count(),
            connector: prefix.contains('├') || prefix.contains('└'),
            rest: line[prefix_bytes..].trim_end(),
        }
    }

    fn raw_depth(&self) -> usize {
        self.width / LEVEL_WIDTH
    }

    /// Entry name (without trailing `/`), kind and trailing `# comment`.
    fn entry(&self) -> (String, EntryKind, Option<String>) {
        let (name, comment) = match self.rest.find(" #") {
            Some(at) => {
                let comment = self.rest[at + 2..].trim();
                (
                    self.rest[..at].trim(),
                    (!comment.is_empty()).then(|| comment.to_string()),
                )
            }
            None => (self.rest.trim(), None),
        };
        match name.strip_suffix('/') {
            Some(dir) => (dir.to_string(), EntryKind::Directory, comment),
            None => (name.to_string(), EntryKind::File, comment),
        }
    }

    fn is_project_wrapper(&self) -> bool {
        if self.connector || self.width != 0 {
            return false;
        }
        match self.rest.split(" #").next().map(str::trim) {
            Some(name) => name
                .strip_suffix('/')
                .is_some_and(|dir| !dir.is_empty() && !CONVENTIONAL_DIRS.contains(&dir)),
            None => false,
        }
    }
}

/// Parse the fenced tree under a "File Structure", "Project Structure" or
/// "Source Code" heading.
pub fn parse_file_structure(content: &str) -> Option<FileStructure> {
    let lines: Vec<&str> = content.lines().collect();
    let block = fenced_block_after(&lines, |_, title| {
        title.contains("File Structure")
            || title.contains("Project Structure")
            || title.contains("Source Code")
    })?;

    let mut tree_lines = block
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| TreeLine::split(line))
        .peekable();

    let mut root_name = None;
    if let Some(first) = tree_lines.peek()
        && first.is_project_wrapper()
    {
        let (name, _, _) = first.entry();
        root_name = Some(name);
        tree_lines.next();
    }

    let mut entries: Vec<FileStructureEntry> = Vec::new();
    let mut offset = 0;
    for line in tree_lines {
        if line.rest.is_empty() {
            continue;
        }
        let (name, kind, comment) = line.entry();
        let depth = if !line.connector && line.raw_depth() == 0 {
            if kind == EntryKind::Directory {
                offset = 1;
            }
            0
        } else {
            (line.raw_depth() + offset).saturating_sub(1)
        };

        if let Some(previous) = entries.last_mut()
            && previous.depth < depth
        {
            previous.kind = EntryKind::Directory;
        }
        entries.push(FileStructureEntry {
            name,
            kind,
            comment,
            depth,
        });
    }

    if entries.is_empty() && root_name.is_none() {
        return None;
    }
    Some(FileStructure { root_name, entries })
}

impl FileStructure {
    /// Path of the entry at `index` relative to the project root, built by
    /// walking back through shallower directory entries.
    pub fn relative_path(&self, index: usize) -> Option<String> {
        let target = self.entries.get(index)?;
        let preceding = &self.entries[..index];

        let mut parts = vec![target.name.as_str()];
        let mut depth = target.depth;
        for entry in preceding.iter().rev() {
            if depth == 0 {
                break;
            }
            if entry.depth < depth && entry.kind == EntryKind::Directory {
                parts.push(entry.name.as_str());
                depth = entry.depth;
            }
        }
        parts.reverse();

        if depth == 0
            && let Some(root) = self.root_name.as_deref()
            && parts.first() != Some(&root)
        {
            let under_other_root = preceding
                .iter()
                .any(|entry| entry.depth == 0 && entry.kind == EntryKind::Directory);
            if !under_other_root {
                parts.insert(0, root);
            }
        }
        Some(parts.join("/"))
    }
}

/// Parse `N. Title` sections of research.md that record a decision.
pub fn parse_research_decisions(content: &str) -> Vec<ResearchDecision> {
    let lines: Vec<&str> = content.lines().collect();
    let mut decisions = Vec::new();

    for heading in headings(&lines)
        .iter()
        .filter(|h| h.level == 2 || h.level == 3)
    {
        let Some(caps) = DECISION_HEADING.captures(heading.title) else {
            continue;
        };
        let end = span_end(&lines, heading, 3);
        let mut decision = String::new();
        let mut rationale = String::new();
        for line in &lines[heading.line + 1..end] {
            if let Some(value) = bold_field(line, "Decision") {
                decision = value.to_string();
            } else if let Some(value) = bold_field(line, "Rationale") {
                rationale = value.to_string();
            }
        }
        if decision.is_empty() {
            continue;
        }
        decisions.push(ResearchDecision {
            title: caps[2].trim().to_string(),
            decision,
            rationale,
        });
    }
    decisions
}
