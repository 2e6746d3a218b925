//! Collection CRUD, ordering and hierarchy materialization.

use super::access::{authorize, authorize_node, NodeRef};
use super::hierarchy::{assemble, root_items, subtree_folder_items, subtree_folders, SubtreeRoot};
use super::positions::{self, SiblingGroup};
use super::rows::{parse_collection_row, require_collection};
use super::{Database, new_id, now_ms};
use crate::error::{ApiError, ApiResult};
use crate::types::{
    Collection, CollectionTree, ContainerFields, ContainerPatch, DEFAULT_ICON_COLOR, NewCollection,
};
use rusqlite::{Connection, params};
use tracing::info;

/// Icon given to collections created without one.
pub const DEFAULT_COLLECTION_ICON: &str = "InboxStack";

pub(crate) fn validate_fields(fields: &ContainerFields) -> ApiResult<()> {
    if fields.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    Ok(())
}

/// Apply a partial update to a collection, folder or item row.
///
/// Position and parent columns are never touched here.
pub(crate) fn apply_patch(
    conn: &Connection,
    table: &str,
    id: &str,
    patch: &ContainerPatch,
) -> ApiResult<()> {
    if let Some(name) = &patch.name
        && name.trim().is_empty()
    {
        return Err(ApiError::invalid_value("name", "name must not be empty"));
    }

    let sql = format!(
        "UPDATE {} SET
            name = COALESCE(?2, name),
            description = CASE WHEN ?3 THEN ?4 ELSE description END,
            icon = CASE WHEN ?5 THEN ?6 ELSE icon END,
            icon_color = CASE WHEN ?7 THEN ?8 ELSE icon_color END,
            icon_type = COALESCE(?9, icon_type),
            updated_at = ?10
         WHERE id = ?1",
        table
    );
    conn.execute(
        &sql,
        params![
            id,
            patch.name,
            patch.description.is_some(),
            patch.description.clone().flatten(),
            patch.icon.is_some(),
            patch.icon.clone().flatten(),
            patch.icon_color.is_some(),
            patch.icon_color.clone().flatten(),
            patch.icon_type.map(|t| t.as_str()),
            now_ms(),
        ],
    )?;
    Ok(())
}

/// Insert a collection row at `position`.
pub(crate) fn insert_collection(
    conn: &Connection,
    workspace_id: &str,
    fields: &ContainerFields,
    position: i64,
) -> ApiResult<Collection> {
    let id = new_id();
    let now = now_ms();
    conn.execute(
        "INSERT INTO collections (
            id, workspace_id, name, description, icon, icon_color, icon_type,
            position, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            &id,
            workspace_id,
            &fields.name,
            &fields.description,
            fields.icon.as_deref().unwrap_or(DEFAULT_COLLECTION_ICON),
            fields.icon_color.as_deref().unwrap_or(DEFAULT_ICON_COLOR),
            fields.icon_type.unwrap_or_default().as_str(),
            position,
            now,
        ],
    )?;
    require_collection(conn, &id)
}

/// Materialize a collection with its full folder/item hierarchy.
pub(crate) fn load_collection_tree(conn: &Connection, id: &str) -> ApiResult<CollectionTree> {
    let collection = require_collection(conn, id)?;
    let folders = subtree_folders(conn, SubtreeRoot::Collection(id))?;
    let folder_items = subtree_folder_items(conn, SubtreeRoot::Collection(id))?;
    let items = root_items(conn, id)?;

    Ok(CollectionTree {
        collection,
        folders: assemble(folders, folder_items),
        items,
    })
}

impl Database {
    /// Create a collection at the end of its workspace's collection list.
    pub fn create_collection(&self, user_id: &str, input: NewCollection) -> ApiResult<Collection> {
        validate_fields(&input.fields)?;

        let collection = self.with_tx(|tx| {
            authorize(tx, &input.workspace_id, user_id)?;
            let group = SiblingGroup::Collections {
                workspace_id: input.workspace_id.clone(),
            };
            let position = positions::append(tx, &group)?;
            insert_collection(tx, &input.workspace_id, &input.fields, position)
        })?;

        info!(collection_id = %collection.id, workspace_id = %collection.workspace_id, position = collection.position, "Created collection");
        Ok(collection)
    }

    /// Collections of a workspace in position order.
    pub fn list_collections(&self, workspace_id: &str, user_id: &str) -> ApiResult<Vec<Collection>> {
        self.with_conn(|conn| {
            authorize(conn, workspace_id, user_id)?;
            let mut stmt = conn.prepare(
                "SELECT * FROM collections WHERE workspace_id = ?1 ORDER BY position ASC, rowid ASC",
            )?;
            let collections = stmt
                .query_map(params![workspace_id], parse_collection_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(collections)
        })
    }

    /// Get a collection with every descendant folder and item.
    pub fn get_collection_tree(&self, collection_id: &str, user_id: &str) -> ApiResult<CollectionTree> {
        let max_depth = self.max_depth();
        self.with_conn(|conn| {
            authorize_node(conn, NodeRef::Collection(collection_id), user_id, max_depth)?;
            load_collection_tree(conn, collection_id)
        })
    }

    /// Update a collection's descriptive fields.
    pub fn update_collection(
        &self,
        collection_id: &str,
        patch: ContainerPatch,
        user_id: &str,
    ) -> ApiResult<Collection> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Collection(collection_id), user_id, max_depth)?;
            apply_patch(tx, "collections", collection_id, &patch)?;
            require_collection(tx, collection_id)
        })
    }

    /// Delete a collection with its entire subtree.
    pub fn delete_collection(&self, collection_id: &str, user_id: &str) -> ApiResult<()> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            let workspace_id =
                authorize_node(tx, NodeRef::Collection(collection_id), user_id, max_depth)?;
            let group = SiblingGroup::Collections { workspace_id };
            positions::remove_and_compact(tx, &group, collection_id)
        })?;

        info!(collection_id, "Deleted collection");
        Ok(())
    }

    /// Move a collection to `position` within its workspace.
    pub fn reorder_collection(
        &self,
        collection_id: &str,
        position: i64,
        user_id: &str,
    ) -> ApiResult<Collection> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            let workspace_id =
                authorize_node(tx, NodeRef::Collection(collection_id), user_id, max_depth)?;
            let group = SiblingGroup::Collections { workspace_id };
            positions::reorder(tx, &group, collection_id, position)?;
            require_collection(tx, collection_id)
        })
    }
}
