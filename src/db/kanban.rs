//! Kanban boards and columns.

use super::access::{authorize_node, NodeRef};
use super::kanban_tasks::{insert_task, parse_card_rows};
use super::positions::{self, SiblingGroup};
use super::rows::{get_board_for_item, parse_column_row, require_board, require_column, require_item};
use super::{Database, new_id, now_ms};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::types::{
    BoardView, ColumnPatch, ColumnSpec, ColumnView, ItemType, KanbanBoard, KanbanColumn, NewColumn,
    NewTask, TaskCard,
};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use tracing::info;

/// Columns seeded into a new list when the caller supplies none.
pub const DEFAULT_COLUMNS: [(&str, &str); 3] = [
    ("To Do", "#3b82f6"),
    ("In Progress", "#f59e0b"),
    ("Done", "#10b981"),
];

/// Title of the sample task placed in the first default column.
pub const DEFAULT_TASK_TITLE: &str = "hello world";

pub(crate) fn insert_board(conn: &Connection, item_id: &str) -> ApiResult<KanbanBoard> {
    let id = new_id();
    let now = now_ms();
    conn.execute(
        "INSERT INTO kanban_boards (id, item_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![&id, item_id, now],
    )?;
    require_board(conn, &id)
}

pub(crate) fn insert_column(
    conn: &Connection,
    board_id: &str,
    title: &str,
    color: Option<&str>,
    position: i64,
) -> ApiResult<KanbanColumn> {
    if title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    let id = new_id();
    let now = now_ms();
    conn.execute(
        "INSERT INTO kanban_columns (id, kanban_board_id, title, position, color, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![&id, board_id, title, position, color, now],
    )?;
    require_column(conn, &id)
}

/// Create the board for a new list item.
///
/// Caller columns are placed in the given order. Without them the default
/// columns are created and the first one receives the sample task.
pub(crate) fn seed_board(
    conn: &Connection,
    item_id: &str,
    columns: Option<&[ColumnSpec]>,
) -> ApiResult<KanbanBoard> {
    let board = insert_board(conn, item_id)?;

    match columns {
        Some(custom) if !custom.is_empty() => {
            for (position, column) in custom.iter().enumerate() {
                insert_column(conn, &board.id, &column.title, column.color.as_deref(), position as i64)?;
            }
        }
        _ => {
            let mut first = None;
            for (position, (title, color)) in DEFAULT_COLUMNS.iter().enumerate() {
                let column = insert_column(conn, &board.id, title, Some(color), position as i64)?;
                first.get_or_insert(column.id);
            }
            if let Some(column_id) = first {
                let task = NewTask {
                    kanban_column_id: column_id,
                    title: DEFAULT_TASK_TITLE.to_string(),
                    ..Default::default()
                };
                insert_task(conn, &task, 0)?;
            }
        }
    }

    Ok(board)
}

fn board_columns(conn: &Connection, board_id: &str) -> ApiResult<Vec<KanbanColumn>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM kanban_columns WHERE kanban_board_id = ?1 ORDER BY position ASC, rowid ASC",
    )?;
    let columns = stmt
        .query_map(params![board_id], parse_column_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Materialize a board: columns, their top-level tasks and each task's subtasks.
pub(crate) fn load_board_view(conn: &Connection, board: KanbanBoard) -> ApiResult<BoardView> {
    let columns = board_columns(conn, &board.id)?;

    let mut top_level: HashMap<String, Vec<TaskCard>> = HashMap::new();
    let mut subtasks: HashMap<String, Vec<TaskCard>> = HashMap::new();
    for card in parse_card_rows(conn, &board.id)? {
        match card.parent_id.clone() {
            Some(parent) => subtasks.entry(parent).or_default().push(card),
            None => top_level.entry(card.kanban_column_id.clone()).or_default().push(card),
        }
    }

    let columns = columns
        .into_iter()
        .map(|column| {
            let cards = top_level
                .remove(&column.id)
                .unwrap_or_default()
                .into_iter()
                .map(|mut card| {
                    card.subtasks = subtasks.remove(&card.id).unwrap_or_default();
                    card.is_parent = card.is_parent || !card.subtasks.is_empty();
                    card
                })
                .collect();
            ColumnView {
                id: column.id,
                title: column.title,
                color: column.color,
                position: column.position,
                cards,
            }
        })
        .collect();

    Ok(BoardView {
        id: board.id,
        item_id: board.item_id,
        columns,
        created_at: board.created_at,
        updated_at: board.updated_at,
    })
}

impl Database {
    /// Create an empty board for a list item.
    pub fn create_board(&self, item_id: &str, user_id: &str) -> ApiResult<KanbanBoard> {
        let max_depth = self.max_depth();

        let board = self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Item(item_id), user_id, max_depth)?;
            let item = require_item(tx, item_id)?;
            if item.item_type != ItemType::List {
                return Err(ApiError::new(ErrorCode::NotAList, "Item is not a list type")
                    .with_field("itemId"));
            }
            if get_board_for_item(tx, item_id)?.is_some() {
                return Err(ApiError::new(
                    ErrorCode::BoardExists,
                    "Kanban board already exists for this item",
                ));
            }
            insert_board(tx, item_id)
        })?;

        info!(board_id = %board.id, item_id, "Created kanban board");
        Ok(board)
    }

    /// Get the materialized board of a list item.
    pub fn get_board(&self, item_id: &str, user_id: &str) -> ApiResult<BoardView> {
        let max_depth = self.max_depth();
        self.with_conn(|conn| {
            authorize_node(conn, NodeRef::Item(item_id), user_id, max_depth)?;
            let board = get_board_for_item(conn, item_id)?.ok_or_else(|| {
                ApiError::not_found(ErrorCode::BoardNotFound, "Kanban board for item", item_id)
            })?;
            load_board_view(conn, board)
        })
    }

    /// Append a column to a board.
    pub fn create_column(&self, user_id: &str, input: NewColumn) -> ApiResult<KanbanColumn> {
        let max_depth = self.max_depth();

        let column = self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Board(&input.kanban_board_id), user_id, max_depth)?;
            let group = SiblingGroup::Columns {
                board_id: input.kanban_board_id.clone(),
            };
            let position = positions::append(tx, &group)?;
            insert_column(
                tx,
                &input.kanban_board_id,
                &input.title,
                input.color.as_deref(),
                position,
            )
        })?;

        info!(column_id = %column.id, board_id = %column.kanban_board_id, position = column.position, "Created column");
        Ok(column)
    }

    /// Update a column's title or colour.
    pub fn update_column(&self, column_id: &str, patch: ColumnPatch, user_id: &str) -> ApiResult<KanbanColumn> {
        let max_depth = self.max_depth();
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(ApiError::invalid_value("title", "title must not be empty"));
        }

        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Column(column_id), user_id, max_depth)?;
            tx.execute(
                "UPDATE kanban_columns SET
                    title = COALESCE(?2, title),
                    color = CASE WHEN ?3 THEN ?4 ELSE color END,
                    updated_at = ?5
                 WHERE id = ?1",
                params![
                    column_id,
                    patch.title,
                    patch.color.is_some(),
                    patch.color.clone().flatten(),
                    now_ms()
                ],
            )?;
            require_column(tx, column_id)
        })
    }

    /// Move a column to `position` within its board.
    pub fn reorder_column(&self, column_id: &str, position: i64, user_id: &str) -> ApiResult<KanbanColumn> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Column(column_id), user_id, max_depth)?;
            let column = require_column(tx, column_id)?;
            let group = SiblingGroup::Columns {
                board_id: column.kanban_board_id,
            };
            positions::reorder(tx, &group, column_id, position)?;
            require_column(tx, column_id)
        })
    }

    /// Delete a column with its tasks and subtasks.
    pub fn delete_column(&self, column_id: &str, user_id: &str) -> ApiResult<()> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Column(column_id), user_id, max_depth)?;
            let column = require_column(tx, column_id)?;
            let group = SiblingGroup::Columns {
                board_id: column.kanban_board_id,
            };
            positions::remove_and_compact(tx, &group, column_id)
        })?;

        info!(column_id, "Deleted column");
        Ok(())
    }
}
