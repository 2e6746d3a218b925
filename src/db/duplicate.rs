//! Recursive deep copy of collections, folders and items.
//!
//! Only the duplicated root gets the copy suffix and is appended to the end of
//! its sibling group. Everything below it keeps its name and its position in
//! the copied group. Each duplicate runs in one transaction.

use super::access::{authorize_node, collection_of_folder, collection_of_item, folder_lineage, NodeRef};
use super::collections::{insert_collection, load_collection_tree};
use super::folders::{insert_folder, load_folder_tree};
use super::items::insert_item;
use super::kanban::{insert_board, insert_column};
use super::positions::{self, SiblingGroup};
use super::rows::{
    get_board_for_item, require_collection, require_column, require_folder, require_item,
};
use super::{Database, new_id, now_ms};
use crate::error::{ApiError, ApiResult};
use crate::types::{
    COPY_SUFFIX, Collection, CollectionTree, ContainerFields, Folder, FolderTree, IconType, Item,
    ItemView,
};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use tracing::{debug, info};

fn copied_fields(
    name: &str,
    description: &Option<String>,
    icon: &Option<String>,
    icon_color: &Option<String>,
    icon_type: IconType,
    suffix: bool,
) -> ContainerFields {
    ContainerFields {
        name: if suffix {
            format!("{}{}", name, COPY_SUFFIX)
        } else {
            name.to_string()
        },
        description: description.clone(),
        icon: icon.clone(),
        icon_color: icon_color.clone(),
        icon_type: Some(icon_type),
    }
}

fn folder_fields(folder: &Folder, suffix: bool) -> ContainerFields {
    copied_fields(
        &folder.name,
        &folder.description,
        &folder.icon,
        &folder.icon_color,
        folder.icon_type,
        suffix,
    )
}

fn item_fields(item: &Item, suffix: bool) -> ContainerFields {
    copied_fields(
        &item.name,
        &item.description,
        &item.icon,
        &item.icon_color,
        item.icon_type,
        suffix,
    )
}

/// Copies the board of `source_item_id`, if any, onto `target_item_id`.
fn copy_board(conn: &Connection, source_item_id: &str, target_item_id: &str) -> ApiResult<()> {
    let Some(source) = get_board_for_item(conn, source_item_id)? else {
        return Ok(());
    };
    let board = insert_board(conn, target_item_id)?;

    let mut column_map: HashMap<String, String> = HashMap::new();
    let columns = SiblingGroup::Columns {
        board_id: source.id.clone(),
    };
    for (position, column_id) in positions::load_ids(conn, &columns)?.iter().enumerate() {
        let column = require_column(conn, column_id)?;
        let copy = insert_column(
            conn,
            &board.id,
            &column.title,
            column.color.as_deref(),
            position as i64,
        )?;
        column_map.insert(column.id, copy.id);
    }

    // Parents first so subtasks can point at their copied parent.
    let mut stmt = conn.prepare(
        "SELECT t.id, t.kanban_column_id, t.parent_task_id
         FROM kanban_tasks t
         JOIN kanban_columns c ON c.id = t.kanban_column_id
         WHERE c.kanban_board_id = ?1
         ORDER BY t.parent_task_id IS NOT NULL, t.position ASC, t.rowid ASC",
    )?;
    let tasks = stmt
        .query_map(params![&source.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let now = now_ms();
    let mut task_map: HashMap<String, String> = HashMap::new();
    for (task_id, column_id, parent_id) in tasks {
        let new_column = column_map
            .get(&column_id)
            .ok_or_else(|| ApiError::internal(format!("column {} was not copied", column_id)))?;
        let new_parent = match parent_id {
            Some(parent) => Some(task_map.get(&parent).cloned().ok_or_else(|| {
                ApiError::internal(format!("parent task {} was not copied", parent))
            })?),
            None => None,
        };
        let new_task = new_id();
        conn.execute(
            "INSERT INTO kanban_tasks (
                id, kanban_column_id, title, description, priority, assignee_id, due_date,
                position, parent_task_id, done, is_parent, tags, created_at, updated_at
             )
             SELECT ?1, ?2, title, description, priority, assignee_id, due_date,
                    position, ?3, done, is_parent, tags, ?4, ?4
             FROM kanban_tasks WHERE id = ?5",
            params![&new_task, new_column, new_parent, now, &task_id],
        )?;
        task_map.insert(task_id, new_task);
    }

    debug!(source_board = %source.id, board_id = %board.id, columns = column_map.len(), tasks = task_map.len(), "Copied kanban board");
    Ok(())
}

fn copy_item(
    conn: &Connection,
    source: &Item,
    collection_id: &str,
    parent_folder_id: Option<&str>,
    position: i64,
    suffix: bool,
) -> ApiResult<Item> {
    let copy = insert_item(
        conn,
        Some(collection_id),
        parent_folder_id,
        source.item_type,
        &item_fields(source, suffix),
        position,
    )?;
    copy_board(conn, &source.id, &copy.id)?;
    Ok(copy)
}

/// Copy the folders and items directly under `source` (and recursively below)
/// into `target`. `depth` is the nesting level of `source`.
fn copy_folder_contents(
    conn: &Connection,
    source_id: &str,
    target_id: &str,
    collection_id: &str,
    depth: usize,
    max_depth: usize,
) -> ApiResult<()> {
    if depth > max_depth {
        return Err(ApiError::depth_exceeded(max_depth));
    }

    let folders = SiblingGroup::ChildFolders {
        parent_folder_id: source_id.to_string(),
    };
    for (position, folder_id) in positions::load_ids(conn, &folders)?.iter().enumerate() {
        let child = require_folder(conn, folder_id)?;
        let copy = insert_folder(
            conn,
            Some(collection_id),
            Some(target_id),
            &folder_fields(&child, false),
            position as i64,
        )?;
        copy_folder_contents(conn, &child.id, &copy.id, collection_id, depth + 1, max_depth)?;
    }

    let items = SiblingGroup::FolderItems {
        parent_folder_id: source_id.to_string(),
    };
    for (position, item_id) in positions::load_ids(conn, &items)?.iter().enumerate() {
        let item = require_item(conn, item_id)?;
        copy_item(conn, &item, collection_id, Some(target_id), position as i64, false)?;
    }
    Ok(())
}

fn copy_collection(conn: &Connection, source: &Collection, max_depth: usize) -> ApiResult<Collection> {
    let group = SiblingGroup::Collections {
        workspace_id: source.workspace_id.clone(),
    };
    let position = positions::append(conn, &group)?;
    let fields = copied_fields(
        &source.name,
        &source.description,
        &source.icon,
        &source.icon_color,
        source.icon_type,
        true,
    );
    let copy = insert_collection(conn, &source.workspace_id, &fields, position)?;

    let folders = SiblingGroup::RootFolders {
        collection_id: source.id.clone(),
    };
    for (position, folder_id) in positions::load_ids(conn, &folders)?.iter().enumerate() {
        let folder = require_folder(conn, folder_id)?;
        let folder_copy = insert_folder(
            conn,
            Some(&copy.id),
            None,
            &folder_fields(&folder, false),
            position as i64,
        )?;
        copy_folder_contents(conn, &folder.id, &folder_copy.id, &copy.id, 1, max_depth)?;
    }

    let items = SiblingGroup::RootItems {
        collection_id: source.id.clone(),
    };
    for (position, item_id) in positions::load_ids(conn, &items)?.iter().enumerate() {
        let item = require_item(conn, item_id)?;
        copy_item(conn, &item, &copy.id, None, position as i64, false)?;
    }

    Ok(copy)
}

impl Database {
    /// Deep-copy a collection to the end of its workspace's list.
    pub fn duplicate_collection(&self, collection_id: &str, user_id: &str) -> ApiResult<CollectionTree> {
        let max_depth = self.max_depth();

        let tree = self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Collection(collection_id), user_id, max_depth)?;
            let source = require_collection(tx, collection_id)?;
            let copy = copy_collection(tx, &source, max_depth)?;
            load_collection_tree(tx, &copy.id)
        })?;

        let (folders, items) = tree.descendant_counts();
        info!(source_id = collection_id, collection_id = %tree.collection.id, folders, items, "Duplicated collection");
        Ok(tree)
    }

    /// Deep-copy a folder as the last sibling of the original.
    pub fn duplicate_folder(&self, folder_id: &str, user_id: &str) -> ApiResult<FolderTree> {
        let max_depth = self.max_depth();

        let tree = self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Folder(folder_id), user_id, max_depth)?;
            let source = require_folder(tx, folder_id)?;
            let collection_id = collection_of_folder(tx, &source, max_depth)?;
            let group = SiblingGroup::for_folder(&source)?;
            let position = positions::append(tx, &group)?;

            let copy = insert_folder(
                tx,
                Some(&collection_id),
                source.parent_folder_id.as_deref(),
                &folder_fields(&source, true),
                position,
            )?;
            let depth = folder_lineage(tx, &source.id, max_depth)?.len();
            copy_folder_contents(tx, &source.id, &copy.id, &collection_id, depth, max_depth)?;
            load_folder_tree(tx, &copy.id)
        })?;

        let (folders, items) = tree.descendant_counts();
        info!(source_id = folder_id, folder_id = %tree.folder.id, folders, items, "Duplicated folder");
        Ok(tree)
    }

    /// Copy an item, including its board, as the last sibling of the original.
    pub fn duplicate_item(&self, item_id: &str, user_id: &str) -> ApiResult<ItemView> {
        let max_depth = self.max_depth();

        let view = self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Item(item_id), user_id, max_depth)?;
            let source = require_item(tx, item_id)?;
            let collection_id = collection_of_item(tx, &source, max_depth)?;
            let group = SiblingGroup::for_item(&source)?;
            let position = positions::append(tx, &group)?;

            let item = copy_item(
                tx,
                &source,
                &collection_id,
                source.parent_folder_id.as_deref(),
                position,
                true,
            )?;
            let kanban_board_id = get_board_for_item(tx, &item.id)?.map(|b| b.id);
            Ok(ItemView {
                item,
                kanban_board_id,
            })
        })?;

        info!(source_id = item_id, item_id = %view.item.id, "Duplicated item");
        Ok(view)
    }
}
