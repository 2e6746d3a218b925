//! Workspace resolution and the permission checkpoint.
//!
//! Any node, however deeply nested, resolves to exactly one workspace. Folders
//! and items that do not carry a direct `collection_id` are resolved by an
//! iterative walk over `parent_folder_id`, guarded by a visited set. Folder
//! creation and moves keep every chain within the configured max depth, so a
//! walk that runs past it reports `DepthExceeded` rather than a broken chain.

use super::Database;
use super::rows::{
    get_folder, require_board, require_collection, require_column, require_folder, require_item,
    require_task, require_workspace,
};
use crate::error::{ApiError, ApiResult};
use crate::types::{Folder, Item, Workspace};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashSet;
use tracing::debug;

/// Reference to any node whose workspace can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Collection(&'a str),
    Folder(&'a str),
    Item(&'a str),
    Board(&'a str),
    Column(&'a str),
    Task(&'a str),
}

/// Walk upward from `start` until a folder exposes a `collection_id`.
pub(crate) fn collection_of_folder(
    conn: &Connection,
    start: &Folder,
    max_depth: usize,
) -> ApiResult<String> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = start.clone();

    loop {
        if let Some(collection_id) = &current.collection_id {
            return Ok(collection_id.clone());
        }
        if !visited.insert(current.id.clone()) {
            return Err(ApiError::broken_chain(&start.id));
        }
        if visited.len() > max_depth {
            return Err(ApiError::depth_exceeded(max_depth));
        }
        let Some(parent_id) = current.parent_folder_id.as_deref() else {
            return Err(ApiError::broken_chain(&start.id));
        };
        current = get_folder(conn, parent_id)?.ok_or_else(|| ApiError::broken_chain(&start.id))?;
    }
}

/// Resolve the collection that owns an item.
pub(crate) fn collection_of_item(
    conn: &Connection,
    item: &Item,
    max_depth: usize,
) -> ApiResult<String> {
    if let Some(collection_id) = &item.collection_id {
        return Ok(collection_id.clone());
    }
    let parent_id = item
        .parent_folder_id
        .as_deref()
        .ok_or_else(|| ApiError::broken_chain(&item.id))?;
    let parent = get_folder(conn, parent_id)?.ok_or_else(|| ApiError::broken_chain(&item.id))?;
    collection_of_folder(conn, &parent, max_depth)
}

/// Ids of `folder_id` and every folder above it, nearest first.
pub(crate) fn folder_lineage(
    conn: &Connection,
    folder_id: &str,
    max_depth: usize,
) -> ApiResult<Vec<String>> {
    let mut lineage = Vec::new();
    let mut next = Some(folder_id.to_string());

    while let Some(id) = next {
        if lineage.contains(&id) {
            return Err(ApiError::broken_chain(folder_id));
        }
        if lineage.len() >= max_depth {
            return Err(ApiError::depth_exceeded(max_depth));
        }
        let parent: Option<Option<String>> = conn
            .query_row(
                "SELECT parent_folder_id FROM folders WHERE id = ?1",
                params![&id],
                |row| row.get(0),
            )
            .optional()?;
        lineage.push(id);
        next = parent.flatten();
    }

    Ok(lineage)
}

fn workspace_of_collection(conn: &Connection, collection_id: &str) -> ApiResult<String> {
    Ok(require_collection(conn, collection_id)?.workspace_id)
}

/// Resolve the owning workspace of any node.
pub fn resolve_workspace(conn: &Connection, node: NodeRef<'_>, max_depth: usize) -> ApiResult<String> {
    let workspace_id = match node {
        NodeRef::Collection(id) => workspace_of_collection(conn, id)?,
        NodeRef::Folder(id) => {
            let folder = require_folder(conn, id)?;
            let collection_id = collection_of_folder(conn, &folder, max_depth)?;
            workspace_of_collection(conn, &collection_id)?
        }
        NodeRef::Item(id) => {
            let item = require_item(conn, id)?;
            let collection_id = collection_of_item(conn, &item, max_depth)?;
            workspace_of_collection(conn, &collection_id)?
        }
        NodeRef::Board(id) => {
            let board = require_board(conn, id)?;
            resolve_workspace(conn, NodeRef::Item(&board.item_id), max_depth)?
        }
        NodeRef::Column(id) => {
            let column = require_column(conn, id)?;
            resolve_workspace(conn, NodeRef::Board(&column.kanban_board_id), max_depth)?
        }
        NodeRef::Task(id) => {
            let task = require_task(conn, id)?;
            resolve_workspace(conn, NodeRef::Column(&task.kanban_column_id), max_depth)?
        }
    };

    debug!(?node, workspace_id = %workspace_id, "Resolved workspace");
    Ok(workspace_id)
}

/// Allow the workspace owner or any member; reject everyone else.
pub fn authorize(conn: &Connection, workspace_id: &str, user_id: &str) -> ApiResult<Workspace> {
    let workspace = require_workspace(conn, workspace_id)?;
    if workspace.owner_id == user_id {
        return Ok(workspace);
    }

    let is_member: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2)",
        params![workspace_id, user_id],
        |row| row.get(0),
    )?;

    if is_member {
        Ok(workspace)
    } else {
        debug!(workspace_id, user_id, "Workspace access denied");
        Err(ApiError::access_denied(workspace_id))
    }
}

/// Allow only the workspace owner.
pub fn authorize_owner(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
    action: &str,
) -> ApiResult<Workspace> {
    let workspace = authorize(conn, workspace_id, user_id)?;
    if workspace.owner_id != user_id {
        return Err(ApiError::owner_only(action));
    }
    Ok(workspace)
}

/// Resolve a node's workspace and check the user may act on it.
pub fn authorize_node(
    conn: &Connection,
    node: NodeRef<'_>,
    user_id: &str,
    max_depth: usize,
) -> ApiResult<String> {
    let workspace_id = resolve_workspace(conn, node, max_depth)?;
    authorize(conn, &workspace_id, user_id)?;
    Ok(workspace_id)
}

impl Database {
    /// Resolve the workspace that owns a node.
    pub fn resolve_workspace(&self, node: NodeRef<'_>) -> ApiResult<String> {
        let max_depth = self.max_depth();
        self.with_conn(|conn| resolve_workspace(conn, node, max_depth))
    }

    /// Check whether a user may act inside a workspace.
    pub fn authorize(&self, workspace_id: &str, user_id: &str) -> ApiResult<Workspace> {
        self.with_conn(|conn| authorize(conn, workspace_id, user_id))
    }
}
