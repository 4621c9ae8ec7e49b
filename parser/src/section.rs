//! Line-level helpers shared by the document parsers.
//!
//! Every parser follows the same scan: locate an anchor heading, slice the
//! section it opens, then walk the slice line by line. Headings inside fenced
//! code blocks never count as boundaries.

use regex_lite::Regex;

/// Compile a pattern known to be valid at build time.
#[allow(clippy::expect_used)]
pub(crate) fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("static pattern must compile")
}

/// A markdown heading found outside fenced code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Heading<'a> {
    /// Zero-based line index of the heading.
    pub line: usize,
    pub level: usize,
    pub title: &'a str,
}

pub(crate) fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Parse an ATX heading (`## Title`) into its level and trimmed title.
pub(crate) fn heading_level(line: &str) -> Option<(usize, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((hashes, rest.trim()))
}

/// All headings of a document, skipping anything inside fenced code.
pub(crate) fn headings<'a>(lines: &[&'a str]) -> Vec<Heading<'a>> {
    let mut in_fence = false;
    let mut found = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some((level, title)) = heading_level(line) {
            found.push(Heading {
                line: index,
                level,
                title,
            });
        }
    }
    found
}

/// Index of the first heading after `heading` whose level is at most `max_level`,
/// or the document length.
pub(crate) fn span_end(lines: &[&str], heading: &Heading<'_>, max_level: usize) -> usize {
    headings(lines)
        .into_iter()
        .find(|h| h.line > heading.line && h.level <= max_level)
        .map_or(lines.len(), |h| h.line)
}

/// Body lines of the first section whose heading satisfies `matches`.
///
/// The slice runs until the next heading at the same or a higher level.
pub(crate) fn section<'a>(
    lines: &[&'a str],
    matches: impl Fn(usize, &str) -> bool,
) -> Option<Vec<&'a str>> {
    let heading = headings(lines)
        .into_iter()
        .find(|h| matches(h.level, h.title))?;
    let end = span_end(lines, &heading, heading.level);
    Some(lines[heading.line + 1..end].to_vec())
}

/// Contents of the first fenced block inside the section opened by a heading
/// that satisfies `matches`.
pub(crate) fn fenced_block_after<'a>(
    lines: &[&'a str],
    matches: impl Fn(usize, &str) -> bool,
) -> Option<Vec<&'a str>> {
    let body = section(lines, matches)?;
    let open = body.iter().position(|line| is_fence(line))?;
    let close = body[open + 1..]
        .iter()
        .position(|line| is_fence(line))
        .map_or(body.len(), |offset| open + 1 + offset);
    Some(body[open + 1..close].to_vec())
}

/// Split a markdown table row into trimmed cells.
pub(crate) fn table_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') {
        return None;
    }
    let inner = trimmed.trim_start_matches('|').trim_end_matches('|');
    Some(inner.split('|').map(|cell| cell.trim().to_string()).collect())
}

fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
}

/// A markdown table: header cells plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Column index whose header contains `needle`, case-insensitively.
    pub fn column(&self, needle: &str) -> Option<usize> {
        let needle = needle.to_ascii_lowercase();
        self.header
            .iter()
            .position(|cell| cell.to_ascii_lowercase().contains(&needle))
    }
}

/// First table found in `lines`.
pub(crate) fn first_table(lines: &[&str]) -> Option<Table> {
    let start = lines.iter().position(|line| table_cells(line).is_some())?;
    let mut rows = lines[start..]
        .iter()
        .map_while(|line| table_cells(line));
    let header = rows.next()?;
    let rows = rows.filter(|cells| !is_separator_row(cells)).collect();
    Some(Table { header, rows })
}

/// Text after a `**Label**:` prefix, when the trimmed line starts with one.
pub(crate) fn bold_field<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let rest = line.trim().strip_prefix("**")?;
    let rest = rest.strip_prefix(label)?;
    let rest = rest.strip_prefix("**:").or_else(|| rest.strip_prefix(":**"))?;
    Some(rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn heading_requires_space_after_hashes() {
        assert_eq!(heading_level("## Title"), Some((2, "Title")));
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("plain"), None);
    }

    #[test]
    fn section_stops_at_same_level_heading() {
        let doc = "# Doc\n## A\none\n### A.1\ntwo\n## B\nthree";
        let lines: Vec<&str> = doc.lines().collect();
        let body = section(&lines, |level, title| level == 2 && title == "A").unwrap();
        assert_eq!(body, vec!["one", "### A.1", "two"]);
    }

    #[test]
    fn headings_inside_fences_are_ignored() {
        let doc = "## A\n```\n## not a heading\n```\ntail\n## B";
        let lines: Vec<&str> = doc.lines().collect();
        let body = section(&lines, |_, title| title == "A").unwrap();
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn table_skips_separator_row() {
        let doc = "| A | B |\n|---|:-:|\n| 1 | 2 |\n\nafter";
        let lines: Vec<&str> = doc.lines().collect();
        let table = first_table(&lines).unwrap();
        assert_eq!(table.header, vec!["A", "B"]);
        assert_eq!(table.rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn bold_field_accepts_colon_inside_or_outside() {
        assert_eq!(bold_field("**Type**: contract", "Type"), Some("contract"));
        assert_eq!(bold_field("**Type:** contract", "Type"), Some("contract"));
        assert_eq!(bold_field("Type: contract", "Type"), None);
    }
}
