//! Core types for the playground tree engine.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deserialize a field that distinguishes "absent" from "explicit null".
///
/// Used with `#[serde(default)]`: absent → `None`, `null` → `Some(None)`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

/// How an icon value should be interpreted by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    #[default]
    Solid,
    Outline,
    Emoji,
    Image,
}

string_enum!(IconType {
    Solid => "solid",
    Outline => "outline",
    Emoji => "emoji",
    Image => "image",
});

/// Kind of content an item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    List,
    Doc,
    Whiteboard,
}

string_enum!(ItemType {
    List => "list",
    Doc => "doc",
    Whiteboard => "whiteboard",
});

/// Kanban task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

string_enum!(TaskPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Role of a workspace member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceRole {
    Owner,
    Member,
}

string_enum!(WorkspaceRole {
    Owner => "OWNER",
    Member => "MEMBER",
});

/// Default icon colour for every container kind.
pub const DEFAULT_ICON_COLOR: &str = "#60A5FA";
/// Suffix appended to the root of a duplicated subtree.
pub const COPY_SUFFIX: &str = "-copy";

// =============================================================================
// Entities
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: String,
    pub user_id: String,
    pub workspace_id: String,
    pub role: WorkspaceRole,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub icon_color: Option<String>,
    pub icon_type: IconType,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    /// Denormalized for nested folders; not guaranteed to be populated.
    pub collection_id: Option<String>,
    pub parent_folder_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub icon_color: Option<String>,
    pub icon_type: IconType,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub collection_id: Option<String>,
    pub parent_folder_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub icon: Option<String>,
    pub icon_color: Option<String>,
    pub icon_type: IconType,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanBoard {
    pub id: String,
    pub item_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanColumn {
    pub id: String,
    pub kanban_board_id: String,
    pub title: String,
    pub position: i64,
    pub color: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanTask {
    pub id: String,
    pub kanban_column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<String>,
    pub due_date: Option<i64>,
    pub position: i64,
    pub parent_task_id: Option<String>,
    pub done: bool,
    pub is_parent: bool,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

// =============================================================================
// Inputs
// =============================================================================

/// Icon and descriptive fields shared by every container kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_color: Option<String>,
    #[serde(default)]
    pub icon_type: Option<IconType>,
}

impl ContainerFields {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub workspace_id: String,
    #[serde(flatten)]
    pub fields: ContainerFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    #[serde(flatten)]
    pub fields: ContainerFields,
}

/// Column supplied by the caller when creating a list item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub collection_id: String,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(flatten)]
    pub fields: ContainerFields,
    #[serde(default)]
    pub columns: Option<Vec<ColumnSpec>>,
}

/// Partial update of a container. Never touches position or parent fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon_color: Option<Option<String>>,
    /// `null` is ignored rather than clearing the icon type.
    #[serde(default)]
    pub icon_type: Option<IconType>,
}

/// Destination of a folder or item move.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTarget {
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub kanban_board_id: String,
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub kanban_column_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<TaskPriority>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<i64>>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub is_parent: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMove {
    pub kanban_column_id: String,
    pub position: i64,
}

// =============================================================================
// Materialized views
// =============================================================================

/// A folder with its ordered child folders and items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderTree {
    #[serde(flatten)]
    pub folder: Folder,
    pub child_folders: Vec<FolderTree>,
    pub items: Vec<Item>,
}

impl FolderTree {
    /// Count folders and items in this subtree, excluding the root folder.
    pub fn descendant_counts(&self) -> (usize, usize) {
        self.child_folders.iter().fold(
            (self.child_folders.len(), self.items.len()),
            |(folders, items), child| {
                let (f, i) = child.descendant_counts();
                (folders + f, items + i)
            },
        )
    }
}

/// A collection with its full container hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionTree {
    #[serde(flatten)]
    pub collection: Collection,
    pub folders: Vec<FolderTree>,
    pub items: Vec<Item>,
}

impl CollectionTree {
    /// Total folders and items anywhere below the collection.
    pub fn descendant_counts(&self) -> (usize, usize) {
        self.folders.iter().fold(
            (self.folders.len(), self.items.len()),
            |(folders, items), child| {
                let (f, i) = child.descendant_counts();
                (folders + f, items + i)
            },
        )
    }
}

/// An item together with the id of its kanban board, if it has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub kanban_board_id: Option<String>,
}

/// A task as presented on a board, with its resolved subtasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCard {
    pub id: String,
    pub kanban_column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assignee: Option<String>,
    pub assignee_id: Option<String>,
    pub tags: Vec<String>,
    pub due_date: Option<i64>,
    pub parent_id: Option<String>,
    pub position: i64,
    pub is_parent: bool,
    pub done: bool,
    pub subtasks: Vec<TaskCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub id: String,
    pub title: String,
    pub color: Option<String>,
    pub position: i64,
    pub cards: Vec<TaskCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub id: String,
    pub item_id: String,
    pub columns: Vec<ColumnView>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: ContainerPatch =
            serde_json::from_str(r#"{"description": null, "name": "x"}"#).unwrap();
        assert_eq!(patch.name.as_deref(), Some("x"));
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.icon, None);
    }

    #[test]
    fn new_item_reads_flattened_fields() {
        let input: NewItem = serde_json::from_str(
            r#"{"collectionId": "c1", "type": "list", "name": "Sprint", "iconType": "emoji"}"#,
        )
        .unwrap();
        assert_eq!(input.item_type, ItemType::List);
        assert_eq!(input.fields.name, "Sprint");
        assert_eq!(input.fields.icon_type, Some(IconType::Emoji));
        assert!(input.columns.is_none());
    }

    #[test]
    fn string_enums_roundtrip_through_text() {
        assert_eq!("whiteboard".parse::<ItemType>(), Ok(ItemType::Whiteboard));
        assert_eq!(WorkspaceRole::Owner.as_str(), "OWNER");
        assert!("huge".parse::<TaskPriority>().is_err());
    }
}
