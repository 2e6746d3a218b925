//! Folder CRUD, moves and ordering.

use super::access::{authorize, authorize_node, collection_of_folder, folder_lineage, NodeRef};
use super::collections::{apply_patch, validate_fields};
use super::hierarchy::{assemble, folder_items, subtree_folder_items, subtree_folders, SubtreeRoot};
use super::positions::{self, SiblingGroup};
use super::rows::{get_folder, require_collection, require_folder};
use super::{Database, new_id, now_ms};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::types::{ContainerFields, ContainerPatch, DEFAULT_ICON_COLOR, Folder, FolderTree, MoveTarget, NewFolder};
use rusqlite::{Connection, params};
use tracing::{info, warn};

/// Icon given to folders created without one.
pub const DEFAULT_FOLDER_ICON: &str = "Folder";

/// Where a folder or item will be placed.
#[derive(Debug, Clone)]
pub(crate) struct Placement {
    pub collection_id: String,
    pub parent_folder_id: Option<String>,
    pub workspace_id: String,
    /// Nesting level a folder placed here occupies; root folders are level 1.
    pub depth: usize,
}

/// Resolve a `(collectionId?, parentFolderId?)` pair to one placement.
///
/// Every referenced container is authorized for `user_id` before the two are
/// compared, so a stranger learns nothing about another workspace's folders.
/// A parent folder wins; if both are given they must agree on the collection.
pub(crate) fn resolve_placement(
    conn: &Connection,
    collection_id: Option<&str>,
    parent_folder_id: Option<&str>,
    user_id: &str,
    max_depth: usize,
) -> ApiResult<Placement> {
    let stated = match collection_id {
        Some(id) => {
            let collection = require_collection(conn, id)?;
            authorize(conn, &collection.workspace_id, user_id)?;
            Some(collection)
        }
        None => None,
    };

    let Some(parent_id) = parent_folder_id else {
        let collection = stated.ok_or_else(|| {
            ApiError::missing_field("collectionId")
                .with_details("Either collectionId or parentFolderId must be provided")
        })?;
        return Ok(Placement {
            collection_id: collection.id,
            parent_folder_id: None,
            workspace_id: collection.workspace_id,
            depth: 1,
        });
    };

    let parent = get_folder(conn, parent_id)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::FolderNotFound, "Parent folder", parent_id))?;
    let collection = require_collection(conn, &collection_of_folder(conn, &parent, max_depth)?)?;
    authorize(conn, &collection.workspace_id, user_id)?;

    if let Some(stated) = &stated
        && stated.id != collection.id
    {
        return Err(ApiError::parent_mismatch(
            "Parent folder must belong to the same collection",
        ));
    }

    let depth = folder_lineage(conn, &parent.id, max_depth)?.len() + 1;
    Ok(Placement {
        collection_id: collection.id,
        parent_folder_id: Some(parent.id),
        workspace_id: collection.workspace_id,
        depth,
    })
}

/// Number of folder levels in the subtree rooted at `folder_id`, itself included.
fn subtree_height(conn: &Connection, folder_id: &str, max_depth: usize) -> ApiResult<usize> {
    let height: i64 = conn.query_row(
        "WITH RECURSIVE subtree(id, level) AS (
            SELECT id, 1 FROM folders WHERE id = ?1
            UNION ALL
            SELECT f.id, s.level + 1 FROM folders f JOIN subtree s ON f.parent_folder_id = s.id
            WHERE s.level <= ?2
         )
         SELECT COALESCE(MAX(level), 0) FROM subtree",
        params![folder_id, max_depth as i64],
        |row| row.get(0),
    )?;
    Ok(height as usize)
}

impl Placement {
    pub fn folder_group(&self) -> SiblingGroup {
        match &self.parent_folder_id {
            Some(parent) => SiblingGroup::ChildFolders {
                parent_folder_id: parent.clone(),
            },
            None => SiblingGroup::RootFolders {
                collection_id: self.collection_id.clone(),
            },
        }
    }

    pub fn item_group(&self) -> SiblingGroup {
        match &self.parent_folder_id {
            Some(parent) => SiblingGroup::FolderItems {
                parent_folder_id: parent.clone(),
            },
            None => SiblingGroup::RootItems {
                collection_id: self.collection_id.clone(),
            },
        }
    }
}

/// Insert a folder row.
pub(crate) fn insert_folder(
    conn: &Connection,
    collection_id: Option<&str>,
    parent_folder_id: Option<&str>,
    fields: &ContainerFields,
    position: i64,
) -> ApiResult<Folder> {
    let id = new_id();
    let now = now_ms();
    conn.execute(
        "INSERT INTO folders (
            id, collection_id, parent_folder_id, name, description, icon, icon_color,
            icon_type, position, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            &id,
            collection_id,
            parent_folder_id,
            &fields.name,
            &fields.description,
            fields.icon.as_deref().unwrap_or(DEFAULT_FOLDER_ICON),
            fields.icon_color.as_deref().unwrap_or(DEFAULT_ICON_COLOR),
            fields.icon_type.unwrap_or_default().as_str(),
            position,
            now,
        ],
    )?;
    require_folder(conn, &id)
}

/// Materialize a folder with all folders and items below it.
pub(crate) fn load_folder_tree(conn: &Connection, folder_id: &str) -> ApiResult<FolderTree> {
    let folder = require_folder(conn, folder_id)?;
    let descendants = subtree_folders(conn, SubtreeRoot::Folder(folder_id))?;
    let nested_items = subtree_folder_items(conn, SubtreeRoot::Folder(folder_id))?;

    Ok(FolderTree {
        folder,
        child_folders: assemble(descendants, nested_items),
        items: folder_items(conn, folder_id)?,
    })
}

/// Rewrite the denormalized collection id of every folder and item below `folder_id`.
fn retarget_descendants(conn: &Connection, folder_id: &str, collection_id: &str) -> ApiResult<()> {
    let subtree = "WITH RECURSIVE subtree(id) AS (
            SELECT id FROM folders WHERE parent_folder_id = ?1
            UNION
            SELECT f.id FROM folders f JOIN subtree s ON f.parent_folder_id = s.id
         )";
    conn.execute(
        &format!(
            "{} UPDATE folders SET collection_id = ?2
             WHERE id IN (SELECT id FROM subtree) AND collection_id IS NOT NULL",
            subtree
        ),
        params![folder_id, collection_id],
    )?;
    conn.execute(
        &format!(
            "{} UPDATE items SET collection_id = ?2
             WHERE (parent_folder_id = ?1 OR parent_folder_id IN (SELECT id FROM subtree))
               AND collection_id IS NOT NULL",
            subtree
        ),
        params![folder_id, collection_id],
    )?;
    Ok(())
}

impl Database {
    /// Create a folder under a collection or another folder.
    pub fn create_folder(&self, user_id: &str, input: NewFolder) -> ApiResult<Folder> {
        validate_fields(&input.fields)?;
        let max_depth = self.max_depth();

        let folder = self.with_tx(|tx| {
            let placement = resolve_placement(
                tx,
                input.collection_id.as_deref(),
                input.parent_folder_id.as_deref(),
                user_id,
                max_depth,
            )?;
            if placement.depth > max_depth {
                return Err(ApiError::depth_exceeded(max_depth));
            }

            let position = positions::append(tx, &placement.folder_group())?;
            insert_folder(
                tx,
                Some(&placement.collection_id),
                placement.parent_folder_id.as_deref(),
                &input.fields,
                position,
            )
        })?;

        info!(folder_id = %folder.id, parent_folder_id = ?folder.parent_folder_id, position = folder.position, "Created folder");
        Ok(folder)
    }

    /// Get a folder with its descendant folders and items.
    pub fn get_folder_tree(&self, folder_id: &str, user_id: &str) -> ApiResult<FolderTree> {
        let max_depth = self.max_depth();
        self.with_conn(|conn| {
            authorize_node(conn, NodeRef::Folder(folder_id), user_id, max_depth)?;
            load_folder_tree(conn, folder_id)
        })
    }

    /// Update a folder's descriptive fields.
    pub fn update_folder(&self, folder_id: &str, patch: ContainerPatch, user_id: &str) -> ApiResult<Folder> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Folder(folder_id), user_id, max_depth)?;
            apply_patch(tx, "folders", folder_id, &patch)?;
            require_folder(tx, folder_id)
        })
    }

    /// Delete a folder with everything below it.
    pub fn delete_folder(&self, folder_id: &str, user_id: &str) -> ApiResult<()> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Folder(folder_id), user_id, max_depth)?;
            let folder = require_folder(tx, folder_id)?;
            let group = SiblingGroup::for_folder(&folder)?;
            positions::remove_and_compact(tx, &group, folder_id)
        })?;

        info!(folder_id, "Deleted folder");
        Ok(())
    }

    /// Move a folder under another collection or folder of the same workspace.
    pub fn move_folder(&self, folder_id: &str, target: MoveTarget, user_id: &str) -> ApiResult<Folder> {
        let max_depth = self.max_depth();

        let folder = self.with_tx(|tx| {
            let folder = require_folder(tx, folder_id)?;
            let current_workspace = authorize_node(tx, NodeRef::Folder(folder_id), user_id, max_depth)?;

            let placement = resolve_placement(
                tx,
                target.collection_id.as_deref(),
                target.parent_folder_id.as_deref(),
                user_id,
                max_depth,
            )?;

            if placement.workspace_id != current_workspace {
                warn!(folder_id, from = %current_workspace, to = %placement.workspace_id, "Rejected cross-workspace folder move");
                return Err(ApiError::cross_workspace_move("folder"));
            }

            if let Some(parent_id) = placement.parent_folder_id.as_deref()
                && folder_lineage(tx, parent_id, max_depth)?.iter().any(|id| id == folder_id)
            {
                return Err(ApiError::cycle(folder_id));
            }
            if placement.depth + subtree_height(tx, folder_id, max_depth)? - 1 > max_depth {
                return Err(ApiError::depth_exceeded(max_depth));
            }

            let from = SiblingGroup::for_folder(&folder)?;
            let to = placement.folder_group();
            positions::move_node(tx, folder_id, &from, &to, target.position, |conn| {
                conn.execute(
                    "UPDATE folders SET collection_id = ?2, parent_folder_id = ?3, updated_at = ?4
                     WHERE id = ?1",
                    params![
                        folder_id,
                        &placement.collection_id,
                        &placement.parent_folder_id,
                        now_ms()
                    ],
                )?;
                retarget_descendants(conn, folder_id, &placement.collection_id)
            })?;

            require_folder(tx, folder_id)
        })?;

        info!(folder_id, parent_folder_id = ?folder.parent_folder_id, position = folder.position, "Moved folder");
        Ok(folder)
    }

    /// Move a folder to `position` within its current sibling group.
    pub fn reorder_folder(&self, folder_id: &str, position: i64, user_id: &str) -> ApiResult<Folder> {
        let max_depth = self.max_depth();
        self.with_tx(|tx| {
            authorize_node(tx, NodeRef::Folder(folder_id), user_id, max_depth)?;
            let folder = require_folder(tx, folder_id)?;
            let group = SiblingGroup::for_folder(&folder)?;
            positions::reorder(tx, &group, folder_id, position)?;
            require_folder(tx, folder_id)
        })
    }
}
