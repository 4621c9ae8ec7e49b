//! Kanban board: stories bucketed by how many of their tasks are checked.

use iikit_parser::{IntegrityCheck, Task, UserStory, parse_spec_stories, parse_tasks};
use serde::Serialize;

use crate::error::Result;
use crate::project::{Project, read_optional};

use super::feature_integrity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardColumn {
    Todo,
    InProgress,
    Done,
}

impl BoardColumn {
    /// `done` needs at least one task and all of them checked; `todo` is zero checked.
    pub fn for_progress(checked: usize, total: usize) -> Self {
        if total > 0 && checked == total {
            BoardColumn::Done
        } else if checked == 0 {
            BoardColumn::Todo
        } else {
            BoardColumn::InProgress
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryCard {
    pub id: String,
    pub title: String,
    pub priority: String,
    pub tasks: Vec<Task>,
    /// `"checked/total"`.
    pub progress: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardColumns {
    pub todo: Vec<StoryCard>,
    pub in_progress: Vec<StoryCard>,
    pub done: Vec<StoryCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    #[serde(flatten)]
    pub columns: BoardColumns,
    pub integrity: IntegrityCheck,
}

/// Bucket every story into exactly one column, keeping document order.
pub fn compute_board(stories: &[UserStory], tasks: &[Task]) -> BoardColumns {
    let mut columns = BoardColumns::default();
    for story in stories {
        let story_tasks: Vec<Task> = tasks
            .iter()
            .filter(|task| task.story_tag.as_deref() == Some(story.id.as_str()))
            .cloned()
            .collect();
        let checked = story_tasks.iter().filter(|task| task.checked).count();
        let total = story_tasks.len();
        let card = StoryCard {
            id: story.id.clone(),
            title: story.title.clone(),
            priority: story.priority.clone(),
            tasks: story_tasks,
            progress: format!("{checked}/{total}"),
        };
        match BoardColumn::for_progress(checked, total) {
            BoardColumn::Todo => columns.todo.push(card),
            BoardColumn::InProgress => columns.in_progress.push(card),
            BoardColumn::Done => columns.done.push(card),
        }
    }
    columns
}

pub fn compose(project: &Project, feature_id: &str) -> Result<BoardView> {
    let feature = project.feature(feature_id)?;
    let spec = read_optional(&feature.spec())?.unwrap_or_default();
    let tasks = read_optional(&feature.tasks())?.unwrap_or_default();
    let test_specs = read_optional(&feature.test_specs())?;

    let columns = compute_board(&parse_spec_stories(&spec), &parse_tasks(&tasks));
    let integrity = feature_integrity(&feature, test_specs.as_deref())?;
    Ok(BoardView { columns, integrity })
}
