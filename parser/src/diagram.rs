//! Box-drawn architecture diagram extraction.
//!
//! The fenced block under `## Architecture Overview` is read as a character
//! grid. Boxes are traced corner to corner; vertical connector runs between
//! two boxes become edges.

use serde::Serialize;

use crate::section::fenced_block_after;

const TOP_EDGE: &[char] = &['─', '┬', '┴', '┼'];
const LEFT_EDGE: &[char] = &['│', '├', '┤', '┼'];
const DOWN_ARROWS: &[char] = &['▼', '↓', 'v'];
const UP_ARROWS: &[char] = &['▲', '↑', '^'];
const LABEL_STOP: &[char] = &[
    '│', '─', '┌', '┐', '└', '┘', '┬', '┴', '├', '┤', '┼', '▼', '▲', '↓', '↑',
];

/// Best-effort category of a diagram component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    #[default]
    Default,
    Client,
    Server,
    Storage,
    External,
}

impl NodeCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeCategory::Default => "default",
            NodeCategory::Client => "client",
            NodeCategory::Server => "server",
            NodeCategory::Storage => "storage",
            NodeCategory::External => "external",
        }
    }

    /// Parse a classifier answer; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "client" => Some(NodeCategory::Client),
            "server" => Some(NodeCategory::Server),
            "storage" => Some(NodeCategory::Storage),
            "external" => Some(NodeCategory::External),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramNode {
    pub id: String,
    /// First non-empty line inside the box.
    pub label: String,
    pub content: String,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    #[serde(rename = "type")]
    pub category: NodeCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    top: usize,
    left: usize,
    bottom: usize,
    right: usize,
}

impl Rect {
    fn contains(&self, other: &Rect) -> bool {
        self != other
            && self.top <= other.top
            && self.left <= other.left
            && self.bottom >= other.bottom
            && self.right >= other.right
    }

    fn covers(&self, row: usize, col: usize) -> bool {
        (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col)
    }
}

struct Grid {
    cells: Vec<Vec<char>>,
}

impl Grid {
    fn new(lines: &[&str]) -> Self {
        Self {
            cells: lines.iter().map(|line| line.chars().collect()).collect(),
        }
    }

    fn at(&self, row: usize, col: usize) -> char {
        self.cells
            .get(row)
            .and_then(|line| line.get(col))
            .copied()
            .unwrap_or(' ')
    }

    fn height(&self) -> usize {
        self.cells.len()
    }

    fn width(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Follow the box whose top-left corner sits at (`row`, `col`).
    fn trace_box(&self, row: usize, col: usize) -> Option<Rect> {
        let mut right = col + 1;
        while TOP_EDGE.contains(&self.at(row, right)) {
            right += 1;
        }
        if self.at(row, right) != '┐' {
            return None;
        }

        let mut bottom = row + 1;
        while LEFT_EDGE.contains(&self.at(bottom, col)) {
            bottom += 1;
        }
        if self.at(bottom, col) != '└' || self.at(bottom, right) != '┘' {
            return None;
        }

        Some(Rect {
            top: row,
            left: col,
            bottom,
            right,
        })
    }

    fn text_lines(&self, rect: &Rect) -> Vec<String> {
        (rect.top + 1..rect.bottom)
            .map(|row| {
                (rect.left + 1..rect.right)
                    .map(|col| self.at(row, col))
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Text right of a connector, cut at the next drawing glyph.
    fn trailing_label(&self, row: usize, col: usize) -> Option<String> {
        let text: String = (col + 1..self.width())
            .map(|c| self.at(row, c))
            .take_while(|c| !LABEL_STOP.contains(c))
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

fn is_vertical_connector(c: char) -> bool {
    c == '│' || DOWN_ARROWS.contains(&c) || UP_ARROWS.contains(&c)
}

fn leaf_boxes(grid: &Grid) -> Vec<(Rect, Vec<String>)> {
    let mut boxes = Vec::new();
    for row in 0..grid.height() {
        for col in 0..grid.width() {
            if grid.at(row, col) != '┌' {
                continue;
            }
            if let Some(rect) = grid.trace_box(row, col) {
                let text = grid.text_lines(&rect);
                if !text.is_empty() {
                    boxes.push((rect, text));
                }
            }
        }
    }

    let rects: Vec<Rect> = boxes.iter().map(|(rect, _)| *rect).collect();
    boxes
        .into_iter()
        .filter(|(rect, _)| !rects.iter().any(|inner| rect.contains(inner)))
        .collect()
}

fn infer_edges(grid: &Grid, nodes: &[(Rect, String)]) -> Vec<DiagramEdge> {
    let mut edges: Vec<DiagramEdge> = Vec::new();
    let inside_node = |row: usize, col: usize| nodes.iter().any(|(rect, _)| rect.covers(row, col));

    for col in 0..grid.width() {
        let mut row = 0;
        while row < grid.height() {
            if !is_vertical_connector(grid.at(row, col)) || inside_node(row, col) {
                row += 1;
                continue;
            }
            let start = row;
            while row < grid.height()
                && is_vertical_connector(grid.at(row, col))
                && !inside_node(row, col)
            {
                row += 1;
            }
            let end = row - 1;

            let Some(upper) = start
                .checked_sub(1)
                .and_then(|above| node_with_edge(nodes, col, |rect| rect.bottom == above))
            else {
                continue;
            };
            let Some(lower) = node_with_edge(nodes, col, |rect| rect.top == end + 1) else {
                continue;
            };
            if upper == lower {
                continue;
            }

            let run: Vec<char> = (start..=end).map(|r| grid.at(r, col)).collect();
            let points_up = run.iter().any(|c| UP_ARROWS.contains(c))
                && !run.iter().any(|c| DOWN_ARROWS.contains(c));
            let (from, to) = if points_up {
                (lower, upper)
            } else {
                (upper, lower)
            };
            let label = (start..=end).find_map(|r| grid.trailing_label(r, col));

            if !edges.iter().any(|edge| edge.from == from && edge.to == to) {
                edges.push(DiagramEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                    label,
                });
            }
        }
    }
    edges
}

fn node_with_edge<'a>(
    nodes: &'a [(Rect, String)],
    col: usize,
    on_edge: impl Fn(&Rect) -> bool,
) -> Option<&'a str> {
    nodes
        .iter()
        .find(|(rect, _)| on_edge(rect) && (rect.left..=rect.right).contains(&col))
        .map(|(_, id)| id.as_str())
}

/// Extract nodes and edges from the architecture diagram, if one is present.
pub fn parse_ascii_diagram(content: &str) -> Option<Diagram> {
    let lines: Vec<&str> = content.lines().collect();
    let block = fenced_block_after(&lines, |_, title| title.contains("Architecture Overview"))?;
    let grid = Grid::new(&block);

    let boxes = leaf_boxes(&grid);
    if boxes.is_empty() {
        return None;
    }

    let nodes: Vec<DiagramNode> = boxes
        .iter()
        .enumerate()
        .map(|(index, (rect, text))| DiagramNode {
            id: format!("n{index}"),
            label: text.first().cloned().unwrap_or_default(),
            content: text.join("\n"),
            x: rect.left,
            y: rect.top,
            width: rect.right - rect.left + 1,
            height: rect.bottom - rect.top + 1,
            category: NodeCategory::Default,
        })
        .collect();

    let placed: Vec<(Rect, String)> = boxes
        .iter()
        .zip(&nodes)
        .map(|((rect, _), node)| (*rect, node.id.clone()))
        .collect();
    let edges = infer_edges(&grid, &placed);

    Some(Diagram { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(diagram: &str) -> String {
        format!("# Plan\n\n## Architecture Overview\n\n```\n{diagram}\n```\n\n## Next\n")
    }

    #[test]
    fn nested_box_keeps_only_inner() {
        let content = doc("┌──────────────────┐
│ Outer            │
│  ┌────────────┐  │
│  │ Inner      │  │
│  └────────────┘  │
└──────────────────┘");
        let diagram = parse_ascii_diagram(&content).unwrap();
        assert_eq!(diagram.nodes.len(), 1);
        assert_eq!(diagram.nodes[0].label, "Inner");
        assert_eq!(diagram.nodes[0].x, 3);
        assert_eq!(diagram.nodes[0].y, 2);
        assert_eq!(diagram.nodes[0].width, 14);
        assert_eq!(diagram.nodes[0].height, 3);
    }

    #[test]
    fn vertical_connector_becomes_labelled_edge() {
        let content = doc("┌─────────┐
│ Browser │
│ (SPA)   │
└────┬────┘
     │ WebSocket
     ▼
┌─────────┐
│ Server  │
└─────────┘");
        let diagram = parse_ascii_diagram(&content).unwrap();
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.nodes[0].label, "Browser");
        assert_eq!(diagram.nodes[0].content, "Browser\n(SPA)");
        assert_eq!(
            diagram.edges,
            vec![DiagramEdge {
                from: "n0".to_string(),
                to: "n1".to_string(),
                label: Some("WebSocket".to_string()),
            }]
        );
    }

    #[test]
    fn up_arrow_reverses_direction() {
        let content = doc("┌────────┐
│ Store  │
└────────┘
    ▲
    │
┌────────┐
│ Writer │
└────────┘");
        let diagram = parse_ascii_diagram(&content).unwrap();
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].from, "n1");
        assert_eq!(diagram.edges[0].to, "n0");
        assert_eq!(diagram.edges[0].label, None);
    }

    #[test]
    fn broken_box_is_ignored() {
        let content = doc("┌──────┐
│ Open │
└──────

┌──────┐
│ Ok   │
└──────┘");
        let diagram = parse_ascii_diagram(&content).unwrap();
        assert_eq!(diagram.nodes.len(), 1);
        assert_eq!(diagram.nodes[0].label, "Ok");
    }

    #[test]
    fn empty_boxes_and_missing_section() {
        assert_eq!(parse_ascii_diagram(&doc("┌──┐\n│  │\n└──┘")), None);
        assert_eq!(parse_ascii_diagram("## Technical Context\n"), None);
    }

    #[test]
    fn category_names() {
        assert_eq!(NodeCategory::parse("Storage"), Some(NodeCategory::Storage));
        assert_eq!(NodeCategory::parse("database"), None);
        assert_eq!(NodeCategory::default().as_str(), "default");
    }
}
