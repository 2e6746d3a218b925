//! Contiguous position ordering within sibling groups.
//!
//! A sibling group is the set of rows sharing one parent key. After every
//! operation here completes, the positions in each touched group are exactly
//! `0..n`. Reorders and moves rewrite the full group rather than keeping
//! sparse positions. Callers must run these helpers inside
//! [`Database::with_tx`](super::Database::with_tx).

use super::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::types::{Folder, Item, KanbanTask};
use rusqlite::{Connection, params_from_iter};
use tracing::debug;

/// Parent key identifying one ordered set of siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiblingGroup {
    Collections { workspace_id: String },
    RootFolders { collection_id: String },
    ChildFolders { parent_folder_id: String },
    RootItems { collection_id: String },
    FolderItems { parent_folder_id: String },
    Columns { board_id: String },
    Tasks { column_id: String, parent_task_id: Option<String> },
}

impl SiblingGroup {
    pub fn table(&self) -> &'static str {
        match self {
            SiblingGroup::Collections { .. } => "collections",
            SiblingGroup::RootFolders { .. } | SiblingGroup::ChildFolders { .. } => "folders",
            SiblingGroup::RootItems { .. } | SiblingGroup::FolderItems { .. } => "items",
            SiblingGroup::Columns { .. } => "kanban_columns",
            SiblingGroup::Tasks { .. } => "kanban_tasks",
        }
    }

    fn filter(&self) -> (&'static str, Vec<&str>) {
        match self {
            SiblingGroup::Collections { workspace_id } => ("workspace_id = ?1", vec![workspace_id.as_str()]),
            SiblingGroup::RootFolders { collection_id } | SiblingGroup::RootItems { collection_id } => (
                "collection_id = ?1 AND parent_folder_id IS NULL",
                vec![collection_id.as_str()],
            ),
            SiblingGroup::ChildFolders { parent_folder_id }
            | SiblingGroup::FolderItems { parent_folder_id } => {
                ("parent_folder_id = ?1", vec![parent_folder_id.as_str()])
            }
            SiblingGroup::Columns { board_id } => ("kanban_board_id = ?1", vec![board_id.as_str()]),
            SiblingGroup::Tasks {
                column_id,
                parent_task_id: None,
            } => (
                "kanban_column_id = ?1 AND parent_task_id IS NULL",
                vec![column_id.as_str()],
            ),
            SiblingGroup::Tasks {
                column_id,
                parent_task_id: Some(parent),
            } => (
                "kanban_column_id = ?1 AND parent_task_id = ?2",
                vec![column_id.as_str(), parent.as_str()],
            ),
        }
    }

    /// Group a folder currently belongs to.
    pub fn for_folder(folder: &Folder) -> ApiResult<Self> {
        match (&folder.parent_folder_id, &folder.collection_id) {
            (Some(parent), _) => Ok(SiblingGroup::ChildFolders {
                parent_folder_id: parent.clone(),
            }),
            (None, Some(collection)) => Ok(SiblingGroup::RootFolders {
                collection_id: collection.clone(),
            }),
            (None, None) => Err(ApiError::broken_chain(&folder.id)),
        }
    }

    /// Group an item currently belongs to.
    pub fn for_item(item: &Item) -> ApiResult<Self> {
        match (&item.parent_folder_id, &item.collection_id) {
            (Some(parent), _) => Ok(SiblingGroup::FolderItems {
                parent_folder_id: parent.clone(),
            }),
            (None, Some(collection)) => Ok(SiblingGroup::RootItems {
                collection_id: collection.clone(),
            }),
            (None, None) => Err(ApiError::broken_chain(&item.id)),
        }
    }

    /// Group a task or subtask currently belongs to.
    pub fn for_task(task: &KanbanTask) -> Self {
        SiblingGroup::Tasks {
            column_id: task.kanban_column_id.clone(),
            parent_task_id: task.parent_task_id.clone(),
        }
    }
}

// =============================================================================
// Pure list arithmetic
// =============================================================================

/// Move `node_id` to `target` within `ids`.
///
/// Valid targets are `0..ids.len()`: any existing slot once the node has been
/// lifted out, including the end of the remaining list.
pub fn reorder_ids(mut ids: Vec<String>, node_id: &str, target: i64) -> ApiResult<Vec<String>> {
    let current = ids
        .iter()
        .position(|id| id == node_id)
        .ok_or_else(|| ApiError::internal(format!("{} is missing from its sibling group", node_id)))?;

    if target < 0 || target as usize >= ids.len() {
        return Err(ApiError::invalid_position(target, ids.len()));
    }

    let node = ids.remove(current);
    ids.insert(target as usize, node);
    Ok(ids)
}

/// Insert `node_id` into a group it is not yet part of.
///
/// `None` appends. Explicit targets may range over `0..=ids.len()`.
pub fn insert_id(mut ids: Vec<String>, node_id: &str, target: Option<i64>) -> ApiResult<Vec<String>> {
    ids.retain(|id| id != node_id);
    let index = match target {
        None => ids.len(),
        Some(t) if t >= 0 && t as usize <= ids.len() => t as usize,
        Some(t) => return Err(ApiError::invalid_position(t, ids.len() + 1)),
    };
    ids.insert(index, node_id.to_string());
    Ok(ids)
}

// =============================================================================
// Storage operations
// =============================================================================

/// Load the group's ids in position order.
pub fn load_ids(conn: &Connection, group: &SiblingGroup) -> ApiResult<Vec<String>> {
    let (filter, args) = group.filter();
    let sql = format!(
        "SELECT id FROM {} WHERE {} ORDER BY position ASC, rowid ASC",
        group.table(),
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(params_from_iter(args), |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Next free position at the end of a group: `max + 1`, or 0 when empty.
pub fn append(conn: &Connection, group: &SiblingGroup) -> ApiResult<i64> {
    let (filter, args) = group.filter();
    let sql = format!(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM {} WHERE {}",
        group.table(),
        filter
    );
    let next: i64 = conn.query_row(&sql, params_from_iter(args), |row| row.get(0))?;
    Ok(next)
}

/// Write each id's index as its position.
pub fn rewrite(conn: &Connection, group: &SiblingGroup, ordered: &[String]) -> ApiResult<()> {
    let now = now_ms();
    let sql = format!(
        "UPDATE {} SET position = ?1, updated_at = ?2 WHERE id = ?3 AND position != ?1",
        group.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    for (index, id) in ordered.iter().enumerate() {
        stmt.execute(rusqlite::params![index as i64, now, id])?;
    }
    Ok(())
}

/// Renumber a group to `0..n` keeping its current order.
pub fn compact(conn: &Connection, group: &SiblingGroup) -> ApiResult<()> {
    let ids = load_ids(conn, group)?;
    rewrite(conn, group, &ids)
}

/// Move a node to `target` within its current group. Returns the new position.
pub fn reorder(
    conn: &Connection,
    group: &SiblingGroup,
    node_id: &str,
    target: i64,
) -> ApiResult<i64> {
    let ids = load_ids(conn, group)?;
    let ordered = reorder_ids(ids, node_id, target)?;
    rewrite(conn, group, &ordered)?;
    debug!(?group, node_id, target, "Reordered sibling group");
    Ok(target)
}

/// Relocate a node from one group to another.
///
/// The destination is validated before `relink` runs; `relink` must update
/// the node's parent columns. Both groups are left contiguous. Returns the
/// node's final position.
pub fn move_node<F>(
    conn: &Connection,
    node_id: &str,
    from: &SiblingGroup,
    to: &SiblingGroup,
    target: Option<i64>,
    relink: F,
) -> ApiResult<i64>
where
    F: FnOnce(&Connection) -> ApiResult<()>,
{
    let destination = load_ids(conn, to)?;
    let ordered = insert_id(destination, node_id, target)?;
    let position = ordered
        .iter()
        .position(|id| id == node_id)
        .map(|p| p as i64)
        .unwrap_or_default();

    relink(conn)?;
    rewrite(conn, to, &ordered)?;
    if from != to {
        compact(conn, from)?;
    }

    debug!(node_id, ?from, ?to, position, "Moved node between sibling groups");
    Ok(position)
}

/// Delete a node (cascading through foreign keys) and close the gap it leaves.
pub fn remove_and_compact(conn: &Connection, group: &SiblingGroup, node_id: &str) -> ApiResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", group.table());
    conn.execute(&sql, [node_id])?;
    compact(conn, group)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reorder_moves_node_forward_and_back() {
        let out = reorder_ids(ids(&["a", "b", "c"]), "a", 2).unwrap();
        assert_eq!(out, ids(&["b", "c", "a"]));

        let out = reorder_ids(ids(&["a", "b", "c"]), "c", 0).unwrap();
        assert_eq!(out, ids(&["c", "a", "b"]));
    }

    #[test]
    fn reorder_rejects_out_of_range_targets() {
        assert!(reorder_ids(ids(&["a", "b"]), "a", 2).is_err());
        assert!(reorder_ids(ids(&["a", "b"]), "a", -1).is_err());
    }

    #[test]
    fn insert_appends_when_target_omitted() {
        let out = insert_id(ids(&["a", "b"]), "x", None).unwrap();
        assert_eq!(out, ids(&["a", "b", "x"]));
    }

    #[test]
    fn insert_accepts_end_slot_but_not_beyond() {
        let out = insert_id(ids(&["a", "b"]), "x", Some(2)).unwrap();
        assert_eq!(out, ids(&["a", "b", "x"]));
        assert!(insert_id(ids(&["a", "b"]), "x", Some(3)).is_err());
    }

    #[test]
    fn insert_ignores_stale_copy_of_node() {
        let out = insert_id(ids(&["a", "x", "b"]), "x", Some(0)).unwrap();
        assert_eq!(out, ids(&["x", "a", "b"]));
    }
}
