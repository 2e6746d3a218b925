//! Subtree loading and in-memory assembly of folder hierarchies.
//!
//! Descendant folders are gathered with a recursive CTE over
//! `parent_folder_id`, so nested folders are found whether or not they carry a
//! denormalized `collection_id`. `UNION` (not `UNION ALL`) keeps a corrupt
//! cycle from looping.

use super::rows::{parse_folder_row, parse_item_row};
use crate::error::ApiResult;
use crate::types::{Folder, FolderTree, Item};
use rusqlite::{Connection, params};
use std::collections::HashMap;

/// Where a subtree starts.
#[derive(Debug, Clone, Copy)]
pub enum SubtreeRoot<'a> {
    /// Every folder under a collection.
    Collection(&'a str),
    /// Every folder strictly below a folder.
    Folder(&'a str),
}

impl SubtreeRoot<'_> {
    fn cte(&self) -> &'static str {
        match self {
            SubtreeRoot::Collection(_) => {
                "WITH RECURSIVE subtree(id) AS (
                    SELECT id FROM folders WHERE collection_id = ?1 AND parent_folder_id IS NULL
                    UNION
                    SELECT f.id FROM folders f JOIN subtree s ON f.parent_folder_id = s.id
                 )"
            }
            SubtreeRoot::Folder(_) => {
                "WITH RECURSIVE subtree(id) AS (
                    SELECT id FROM folders WHERE parent_folder_id = ?1
                    UNION
                    SELECT f.id FROM folders f JOIN subtree s ON f.parent_folder_id = s.id
                 )"
            }
        }
    }

    fn key(&self) -> &str {
        match self {
            SubtreeRoot::Collection(id) | SubtreeRoot::Folder(id) => id,
        }
    }
}

/// All folders in the subtree, in position order within each group.
pub fn subtree_folders(conn: &Connection, root: SubtreeRoot<'_>) -> ApiResult<Vec<Folder>> {
    let sql = format!(
        "{} SELECT f.* FROM folders f JOIN subtree s ON f.id = s.id
         ORDER BY f.position ASC, f.rowid ASC",
        root.cte()
    );
    let mut stmt = conn.prepare(&sql)?;
    let folders = stmt
        .query_map(params![root.key()], parse_folder_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(folders)
}

/// All items owned by any folder in the subtree (not the root's own items).
pub fn subtree_folder_items(conn: &Connection, root: SubtreeRoot<'_>) -> ApiResult<Vec<Item>> {
    let sql = format!(
        "{} SELECT i.* FROM items i JOIN subtree s ON i.parent_folder_id = s.id
         ORDER BY i.position ASC, i.rowid ASC",
        root.cte()
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params![root.key()], parse_item_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Items directly under a collection, outside any folder.
pub fn root_items(conn: &Connection, collection_id: &str) -> ApiResult<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM items WHERE collection_id = ?1 AND parent_folder_id IS NULL
         ORDER BY position ASC, rowid ASC",
    )?;
    let items = stmt
        .query_map(params![collection_id], parse_item_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Items directly inside a folder.
pub fn folder_items(conn: &Connection, folder_id: &str) -> ApiResult<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM items WHERE parent_folder_id = ?1 ORDER BY position ASC, rowid ASC",
    )?;
    let items = stmt
        .query_map(params![folder_id], parse_item_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Assemble flat folder and item lists into trees.
///
/// Folders whose parent is not in `folders` become roots. Input order is
/// preserved inside each group, so position-sorted input yields
/// position-sorted children.
pub fn assemble(folders: Vec<Folder>, items: Vec<Item>) -> Vec<FolderTree> {
    let known: std::collections::HashSet<String> = folders.iter().map(|f| f.id.clone()).collect();

    let mut children: HashMap<String, Vec<Folder>> = HashMap::new();
    let mut roots: Vec<Folder> = Vec::new();
    for folder in folders {
        match folder.parent_folder_id.clone() {
            Some(parent) if known.contains(&parent) => {
                children.entry(parent).or_default().push(folder)
            }
            _ => roots.push(folder),
        }
    }

    let mut items_by_folder: HashMap<String, Vec<Item>> = HashMap::new();
    for item in items {
        if let Some(parent) = item.parent_folder_id.clone() {
            items_by_folder.entry(parent).or_default().push(item);
        }
    }

    roots
        .into_iter()
        .map(|folder| build(folder, &mut children, &mut items_by_folder))
        .collect()
}

fn build(
    folder: Folder,
    children: &mut HashMap<String, Vec<Folder>>,
    items: &mut HashMap<String, Vec<Item>>,
) -> FolderTree {
    let child_folders = children
        .remove(&folder.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| build(child, children, items))
        .collect();
    let own_items = items.remove(&folder.id).unwrap_or_default();

    FolderTree {
        folder,
        child_folders,
        items: own_items,
    }
}
