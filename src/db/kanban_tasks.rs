//! Kanban tasks and single-level subtasks.
//!
//! Top-level tasks of a column and the subtasks of one parent are separate
//! sibling groups, both keyed by `(kanban_column_id, parent_task_id)`.

use super::access::{authorize_node, NodeRef};
use super::positions::{self, SiblingGroup};
use super::rows::{parse_task_row, require_column, require_task, require_user};
use super::{Database, new_id, now_ms};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::types::{KanbanTask, NewTask, TaskCard, TaskMove, TaskPatch};
use rusqlite::{Connection, params};
use tracing::{info, warn};

pub(crate) fn insert_task(conn: &Connection, input: &NewTask, position: i64) -> ApiResult<KanbanTask> {
    if input.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    let id = new_id();
    let now = now_ms();
    let tags = serde_json::to_string(input.tags.as_deref().unwrap_or_default())?;

    conn.execute(
        "INSERT INTO kanban_tasks (
            id, kanban_column_id, title, description, priority, assignee_id, due_date,
            position, parent_task_id, done, is_parent, tags, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12, ?12)",
        params![
            &id,
            &input.kanban_column_id,
            &input.title,
            &input.description,
            input.priority.map(|p| p.as_str()),
            &input.assignee_id,
            input.due_date,
            position,
            &input.parent_task_id,
            input.done.unwrap_or(false),
            tags,
            now,
        ],
    )?;
    require_task(conn, &id)
}

/// Every task on a board as a card, in position order, with assignee names.
pub(crate) fn parse_card_rows(conn: &Connection, board_id: &str) -> ApiResult<Vec<TaskCard>> {
    let mut stmt = conn.prepare(
        "SELECT t.*, u.name AS assignee_name
         FROM kanban_tasks t
         JOIN kanban_columns c ON c.id = t.kanban_column_id
         LEFT JOIN users u ON u.id = t.assignee_id
         WHERE c.kanban_board_id = ?1
         ORDER BY t.position ASC, t.rowid ASC",
    )?;
    let cards = stmt
        .query_map(params![board_id], |row| {
            let task = parse_task_row(row)?;
            let assignee: Option<String> = row.get("assignee_name")?;
            Ok(TaskCard {
                id: task.id,
                kanban_column_id: task.kanban_column_id,
                title: task.title,
                description: task.description,
                priority: task.priority,
                assignee,
                assignee_id: task.assignee_id,
                tags: task.tags,
                due_date: task.due_date,
                parent_id: task.parent_task_id,
                position: task.position,
                is_parent: task.is_parent,
                done: task.done,
                subtasks: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cards)
}

fn board_of_column(conn: &Connection, column_id: &str) -> ApiResult<String> {
    Ok(require_column(conn, column_id)?.kanban_board_id)
}

/// Check a prospective parent lives on `board_id` and is not itself a subtask.
fn validate_parent(conn: &Connection, parent_id: &str, board_id: &str) -> ApiResult<KanbanTask> {
    let parent = super::rows::get_task(conn, parent_id)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::TaskNotFound, "Parent task", parent_id))?;
    if parent.parent_task_id.is_some() {
        return Err(ApiError::new(
            ErrorCode::NestedSubtask,
            "Subtasks cannot have subtasks of their own",
        )
        .with_field("parentTaskId"));
    }
    if board_of_column(conn, &parent.kanban_column_id)? != board_id {
        return Err(ApiError::new(
            ErrorCode::ParentMismatch,
            "Parent task must be on the same board",
        )
        .with_field("parentTaskId"));
    }
    Ok(parent)
}

impl Database {
    /// Append a task (or a subtask when `parent_task_id` is set) to its group.
    pub fn create_task(&self, user_id: &str, input: NewTask) -> ApiResult<KanbanTask> {
        let max_depth = self.max_depth();

        let task = self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Column(&input.kanban_column_id), user_id, max_depth)?;
            let board_id = board_of_column(tx, &input.kanban_column_id)?;

            if let Some(parent_id) = input.parent_task_id.as_deref() {
                validate_parent(tx, parent_id, &board_id)?;
            }
            if let Some(assignee) = input.assignee_id.as_deref() {
                require_user(tx, assignee)?;
            }

            let group = SiblingGroup::Tasks {
                column_id: input.kanban_column_id.clone(),
                parent_task_id: input.parent_task_id.clone(),
            };
            let position = positions::append(tx, &group)?;
            let task = insert_task(tx, &input, position)?;

            if let Some(parent_id) = task.parent_task_id.as_deref() {
                tx.execute(
                    "UPDATE kanban_tasks SET is_parent = 1, updated_at = ?2 WHERE id = ?1",
                    params![parent_id, now_ms()],
                )?;
            }
            Ok(task)
        })?;

        info!(task_id = %task.id, column_id = %task.kanban_column_id, parent_task_id = ?task.parent_task_id, position = task.position, "Created task");
        Ok(task)
    }

    /// Partially update a task. Never touches column, parent or position.
    pub fn update_task(&self, task_id: &str, patch: TaskPatch, user_id: &str) -> ApiResult<KanbanTask> {
        let max_depth = self.max_depth();
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(ApiError::invalid_value("title", "title must not be empty"));
        }
        let tags = patch.tags.as_ref().map(serde_json::to_string).transpose()?;

        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Task(task_id), user_id, max_depth)?;
            if let Some(Some(assignee)) = patch.assignee_id.as_ref() {
                require_user(tx, assignee)?;
            }

            tx.execute(
                "UPDATE kanban_tasks SET
                    title = COALESCE(?2, title),
                    description = CASE WHEN ?3 THEN ?4 ELSE description END,
                    priority = CASE WHEN ?5 THEN ?6 ELSE priority END,
                    assignee_id = CASE WHEN ?7 THEN ?8 ELSE assignee_id END,
                    due_date = CASE WHEN ?9 THEN ?10 ELSE due_date END,
                    done = COALESCE(?11, done),
                    is_parent = COALESCE(?12, is_parent),
                    tags = COALESCE(?13, tags),
                    updated_at = ?14
                 WHERE id = ?1",
                params![
                    task_id,
                    patch.title,
                    patch.description.is_some(),
                    patch.description.clone().flatten(),
                    patch.priority.is_some(),
                    patch.priority.flatten().map(|p| p.as_str()),
                    patch.assignee_id.is_some(),
                    patch.assignee_id.clone().flatten(),
                    patch.due_date.is_some(),
                    patch.due_date.flatten(),
                    patch.done,
                    patch.is_parent,
                    tags,
                    now_ms(),
                ],
            )?;
            require_task(tx, task_id)
        })
    }

    /// Delete a task with its subtasks.
    pub fn delete_task(&self, task_id: &str, user_id: &str) -> ApiResult<()> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Task(task_id), user_id, max_depth)?;
            let task = require_task(tx, task_id)?;
            positions::remove_and_compact(tx, &SiblingGroup::for_task(&task), task_id)
        })?;

        info!(task_id, "Deleted task");
        Ok(())
    }

    /// Move a task to `position` in a column of the same board.
    ///
    /// The task keeps its parent, so a subtask moves between the
    /// `(column, parent)` groups and its own subtasks stay where they are.
    pub fn move_task(&self, task_id: &str, target: TaskMove, user_id: &str) -> ApiResult<KanbanTask> {
        let max_depth = self.max_depth();

        let task = self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Task(task_id), user_id, max_depth)?;
            let task = require_task(tx, task_id)?;
            let target_column = super::rows::get_column(tx, &target.kanban_column_id)?.ok_or_else(|| {
                ApiError::not_found(ErrorCode::ColumnNotFound, "Target column", &target.kanban_column_id)
            })?;

            let source_board = board_of_column(tx, &task.kanban_column_id)?;
            if target_column.kanban_board_id != source_board {
                warn!(task_id, from = %source_board, to = %target_column.kanban_board_id, "Rejected cross-board task move");
                return Err(ApiError::cross_board_move());
            }

            let from = SiblingGroup::for_task(&task);
            if task.kanban_column_id == target_column.id {
                positions::reorder(tx, &from, task_id, target.position)?;
            } else {
                let to = SiblingGroup::Tasks {
                    column_id: target_column.id.clone(),
                    parent_task_id: task.parent_task_id.clone(),
                };
                positions::move_node(tx, task_id, &from, &to, Some(target.position), |conn| {
                    conn.execute(
                        "UPDATE kanban_tasks SET kanban_column_id = ?2, updated_at = ?3 WHERE id = ?1",
                        params![task_id, &target_column.id, now_ms()],
                    )?;
                    Ok(())
                })?;
            }

            require_task(tx, task_id)
        })?;

        info!(task_id, column_id = %task.kanban_column_id, position = task.position, "Moved task");
        Ok(task)
    }
}
