//! Item CRUD, moves and ordering. List items get a kanban board on creation.

use super::access::{authorize_node, NodeRef};
use super::collections::{apply_patch, validate_fields};
use super::folders::resolve_placement;
use super::kanban::seed_board;
use super::positions::{self, SiblingGroup};
use super::rows::{get_board_for_item, require_item};
use super::{Database, new_id, now_ms};
use crate::error::{ApiError, ApiResult};
use crate::types::{
    ContainerFields, ContainerPatch, DEFAULT_ICON_COLOR, Item, ItemType, ItemView, MoveTarget, NewItem,
};
use rusqlite::{Connection, params};
use tracing::{info, warn};

pub(crate) fn insert_item(
    conn: &Connection,
    collection_id: Option<&str>,
    parent_folder_id: Option<&str>,
    item_type: ItemType,
    fields: &ContainerFields,
    position: i64,
) -> ApiResult<Item> {
    let id = new_id();
    let now = now_ms();
    conn.execute(
        "INSERT INTO items (
            id, collection_id, parent_folder_id, name, description, item_type, icon,
            icon_color, icon_type, position, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            &id,
            collection_id,
            parent_folder_id,
            &fields.name,
            &fields.description,
            item_type.as_str(),
            &fields.icon,
            fields.icon_color.as_deref().unwrap_or(DEFAULT_ICON_COLOR),
            fields.icon_type.unwrap_or_default().as_str(),
            position,
            now,
        ],
    )?;
    require_item(conn, &id)
}

impl Database {
    /// Create an item at the end of its group.
    ///
    /// `collectionId` is required; a `parentFolderId` must lie in that
    /// collection. A `list` item is created together with its board.
    pub fn create_item(&self, user_id: &str, input: NewItem) -> ApiResult<Item> {
        validate_fields(&input.fields)?;
        if input.collection_id.trim().is_empty() {
            return Err(ApiError::missing_field("collectionId"));
        }
        let max_depth = self.max_depth();

        let item = self.with_tx(|tx| {
            let placement = resolve_placement(
                tx,
                Some(&input.collection_id),
                input.parent_folder_id.as_deref(),
                user_id,
                max_depth,
            )?;

            let position = positions::append(tx, &placement.item_group())?;
            let item = insert_item(
                tx,
                Some(&placement.collection_id),
                placement.parent_folder_id.as_deref(),
                input.item_type,
                &input.fields,
                position,
            )?;

            if item.item_type == ItemType::List {
                seed_board(tx, &item.id, input.columns.as_deref())?;
            }
            Ok(item)
        })?;

        info!(item_id = %item.id, item_type = %item.item_type, position = item.position, "Created item");
        Ok(item)
    }

    /// Get an item with the id of its board, if any.
    pub fn get_item(&self, item_id: &str, user_id: &str) -> ApiResult<ItemView> {
        let max_depth = self.max_depth();
        self.with_conn(|conn| {
            authorize_node(conn, NodeRef::Item(item_id), user_id, max_depth)?;
            let item = require_item(conn, item_id)?;
            let kanban_board_id = get_board_for_item(conn, item_id)?.map(|b| b.id);
            Ok(ItemView {
                item,
                kanban_board_id,
            })
        })
    }

    /// Update an item's descriptive fields.
    pub fn update_item(&self, item_id: &str, patch: ContainerPatch, user_id: &str) -> ApiResult<Item> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Item(item_id), user_id, max_depth)?;
            apply_patch(tx, "items", item_id, &patch)?;
            require_item(tx, item_id)
        })
    }

    /// Delete an item together with its board, columns and tasks.
    pub fn delete_item(&self, item_id: &str, user_id: &str) -> ApiResult<()> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Item(item_id), user_id, max_depth)?;
            let item = require_item(tx, item_id)?;
            let group = SiblingGroup::for_item(&item)?;
            positions::remove_and_compact(tx, &group, item_id)
        })?;

        info!(item_id, "Deleted item");
        Ok(())
    }

    /// Move an item under another collection or folder of the same workspace.
    pub fn move_item(&self, item_id: &str, target: MoveTarget, user_id: &str) -> ApiResult<Item> {
        let max_depth = self.max_depth();

        let item = self.with_tx(|tx| {
            let item = require_item(tx, item_id)?;
            let current_workspace = authorize_node(tx, NodeRef::Item(item_id), user_id, max_depth)?;

            let placement = resolve_placement(
                tx,
                target.collection_id.as_deref(),
                target.parent_folder_id.as_deref(),
                user_id,
                max_depth,
            )?;
            if placement.workspace_id != current_workspace {
                warn!(item_id, from = %current_workspace, to = %placement.workspace_id, "Rejected cross-workspace item move");
                return Err(ApiError::cross_workspace_move("item"));
            }

            let from = SiblingGroup::for_item(&item)?;
            let to = placement.item_group();
            positions::move_node(tx, item_id, &from, &to, target.position, |conn| {
                conn.execute(
                    "UPDATE items SET collection_id = ?2, parent_folder_id = ?3, updated_at = ?4
                     WHERE id = ?1",
                    params![
                        item_id,
                        &placement.collection_id,
                        &placement.parent_folder_id,
                        now_ms()
                    ],
                )?;
                Ok(())
            })?;

            require_item(tx, item_id)
        })?;

        info!(item_id, parent_folder_id = ?item.parent_folder_id, position = item.position, "Moved item");
        Ok(item)
    }

    /// Move an item to `position` within its current sibling group.
    pub fn reorder_item(&self, item_id: &str, position: i64, user_id: &str) -> ApiResult<Item> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Item(item_id), user_id, max_depth)?;
            let item = require_item(tx, item_id)?;
            let group = SiblingGroup::for_item(&item)?;
            positions::reorder(tx, &group, item_id, position)?;
            require_item(tx, item_id)
        })
    }
}
