//! Row parsers and single-row lookups shared by the tree operations.
//!
//! All helpers take a `&Connection` so they can run either on the shared
//! connection or inside an open transaction.

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::types::{
    Collection, Folder, IconType, Item, ItemType, KanbanBoard, KanbanColumn, KanbanTask,
    TaskPriority, User, Workspace, WorkspaceMember, WorkspaceRole,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

fn parse_text<T: FromStr<Err = String>>(row: &Row, idx: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
    })
}

fn parse_opt_text<T: FromStr<Err = String>>(row: &Row, idx: &str) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
        })
    })
    .transpose()
}

pub fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}

pub fn parse_workspace_row(row: &Row) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: row.get("id")?,
        name: row.get("name")?,
        owner_id: row.get("owner_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn parse_member_row(row: &Row) -> rusqlite::Result<WorkspaceMember> {
    Ok(WorkspaceMember {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        workspace_id: row.get("workspace_id")?,
        role: parse_text::<WorkspaceRole>(row, "role")?,
        created_at: row.get("created_at")?,
    })
}

pub fn parse_collection_row(row: &Row) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get("id")?,
        workspace_id: row.get("workspace_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        icon: row.get("icon")?,
        icon_color: row.get("icon_color")?,
        icon_type: parse_text::<IconType>(row, "icon_type")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn parse_folder_row(row: &Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get("id")?,
        collection_id: row.get("collection_id")?,
        parent_folder_id: row.get("parent_folder_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        icon: row.get("icon")?,
        icon_color: row.get("icon_color")?,
        icon_type: parse_text::<IconType>(row, "icon_type")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn parse_item_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get("id")?,
        collection_id: row.get("collection_id")?,
        parent_folder_id: row.get("parent_folder_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        item_type: parse_text::<ItemType>(row, "item_type")?,
        icon: row.get("icon")?,
        icon_color: row.get("icon_color")?,
        icon_type: parse_text::<IconType>(row, "icon_type")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn parse_board_row(row: &Row) -> rusqlite::Result<KanbanBoard> {
    Ok(KanbanBoard {
        id: row.get("id")?,
        item_id: row.get("item_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn parse_column_row(row: &Row) -> rusqlite::Result<KanbanColumn> {
    Ok(KanbanColumn {
        id: row.get("id")?,
        kanban_board_id: row.get("kanban_board_id")?,
        title: row.get("title")?,
        position: row.get("position")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<KanbanTask> {
    let tags_json: Option<String> = row.get("tags")?;

    Ok(KanbanTask {
        id: row.get("id")?,
        kanban_column_id: row.get("kanban_column_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority: parse_opt_text::<TaskPriority>(row, "priority")?,
        assignee_id: row.get("assignee_id")?,
        due_date: row.get("due_date")?,
        position: row.get("position")?,
        parent_task_id: row.get("parent_task_id")?,
        done: row.get("done")?,
        is_parent: row.get("is_parent")?,
        tags: tags_json
            .map(|s| serde_json::from_str(&s).unwrap_or_default())
            .unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

// =============================================================================
// Lookups
// =============================================================================

pub fn get_user(conn: &Connection, id: &str) -> ApiResult<Option<User>> {
    Ok(conn
        .query_row("SELECT * FROM users WHERE id = ?1", params![id], parse_user_row)
        .optional()?)
}

pub fn get_workspace(conn: &Connection, id: &str) -> ApiResult<Option<Workspace>> {
    Ok(conn
        .query_row(
            "SELECT * FROM workspaces WHERE id = ?1",
            params![id],
            parse_workspace_row,
        )
        .optional()?)
}

pub fn get_collection(conn: &Connection, id: &str) -> ApiResult<Option<Collection>> {
    Ok(conn
        .query_row(
            "SELECT * FROM collections WHERE id = ?1",
            params![id],
            parse_collection_row,
        )
        .optional()?)
}

pub fn get_folder(conn: &Connection, id: &str) -> ApiResult<Option<Folder>> {
    Ok(conn
        .query_row("SELECT * FROM folders WHERE id = ?1", params![id], parse_folder_row)
        .optional()?)
}

pub fn get_item(conn: &Connection, id: &str) -> ApiResult<Option<Item>> {
    Ok(conn
        .query_row("SELECT * FROM items WHERE id = ?1", params![id], parse_item_row)
        .optional()?)
}

pub fn get_board(conn: &Connection, id: &str) -> ApiResult<Option<KanbanBoard>> {
    Ok(conn
        .query_row(
            "SELECT * FROM kanban_boards WHERE id = ?1",
            params![id],
            parse_board_row,
        )
        .optional()?)
}

pub fn get_board_for_item(conn: &Connection, item_id: &str) -> ApiResult<Option<KanbanBoard>> {
    Ok(conn
        .query_row(
            "SELECT * FROM kanban_boards WHERE item_id = ?1",
            params![item_id],
            parse_board_row,
        )
        .optional()?)
}

pub fn get_column(conn: &Connection, id: &str) -> ApiResult<Option<KanbanColumn>> {
    Ok(conn
        .query_row(
            "SELECT * FROM kanban_columns WHERE id = ?1",
            params![id],
            parse_column_row,
        )
        .optional()?)
}

pub fn get_task(conn: &Connection, id: &str) -> ApiResult<Option<KanbanTask>> {
    Ok(conn
        .query_row(
            "SELECT * FROM kanban_tasks WHERE id = ?1",
            params![id],
            parse_task_row,
        )
        .optional()?)
}

pub fn require_workspace(conn: &Connection, id: &str) -> ApiResult<Workspace> {
    get_workspace(conn, id)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::WorkspaceNotFound, "Workspace", id))
}

pub fn require_user(conn: &Connection, id: &str) -> ApiResult<User> {
    get_user(conn, id)?.ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound, "User", id))
}

pub fn require_collection(conn: &Connection, id: &str) -> ApiResult<Collection> {
    get_collection(conn, id)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::CollectionNotFound, "Collection", id))
}

pub fn require_folder(conn: &Connection, id: &str) -> ApiResult<Folder> {
    get_folder(conn, id)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::FolderNotFound, "Folder", id))
}

pub fn require_item(conn: &Connection, id: &str) -> ApiResult<Item> {
    get_item(conn, id)?.ok_or_else(|| ApiError::not_found(ErrorCode::ItemNotFound, "Item", id))
}

pub fn require_board(conn: &Connection, id: &str) -> ApiResult<KanbanBoard> {
    get_board(conn, id)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::BoardNotFound, "Kanban board", id))
}

pub fn require_column(conn: &Connection, id: &str) -> ApiResult<KanbanColumn> {
    get_column(conn, id)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::ColumnNotFound, "Column", id))
}

pub fn require_task(conn: &Connection, id: &str) -> ApiResult<KanbanTask> {
    get_task(conn, id)?.ok_or_else(|| ApiError::not_found(ErrorCode::TaskNotFound, "Task", id))
}
