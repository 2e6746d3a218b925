//! Integration tests for the collection/folder/item hierarchy.
//!
//! These tests run against an in-memory SQLite database.

use playground_tree::db::Database;
use playground_tree::db::access::NodeRef;
use playground_tree::error::{ErrorCode, ErrorKind};
use playground_tree::types::{
    Collection, ContainerFields, ContainerPatch, Folder, Item, ItemType, MoveTarget, NewCollection,
    NewFolder, NewItem,
};

const OWNER: &str = "owner";

/// Fresh database with one user and one workspace.
fn setup_db() -> (Database, String) {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    db.upsert_user(Some(OWNER.to_string()), "Owner", None).unwrap();
    let ws = db.create_workspace("Main", OWNER).unwrap();
    (db, ws.id)
}

fn collection(db: &Database, ws: &str, name: &str) -> Collection {
    db.create_collection(
        OWNER,
        NewCollection {
            workspace_id: ws.to_string(),
            fields: ContainerFields::named(name),
        },
    )
    .unwrap()
}

fn root_folder(db: &Database, collection_id: &str, name: &str) -> Folder {
    db.create_folder(
        OWNER,
        NewFolder {
            collection_id: Some(collection_id.to_string()),
            fields: ContainerFields::named(name),
            ..Default::default()
        },
    )
    .unwrap()
}

fn child_folder(db: &Database, parent_id: &str, name: &str) -> Folder {
    db.create_folder(
        OWNER,
        NewFolder {
            parent_folder_id: Some(parent_id.to_string()),
            fields: ContainerFields::named(name),
            ..Default::default()
        },
    )
    .unwrap()
}

fn item(db: &Database, collection_id: &str, folder_id: Option<&str>, kind: ItemType, name: &str) -> Item {
    db.create_item(
        OWNER,
        NewItem {
            collection_id: collection_id.to_string(),
            parent_folder_id: folder_id.map(str::to_string),
            item_type: kind,
            fields: ContainerFields::named(name),
            columns: None,
        },
    )
    .unwrap()
}

fn count(db: &Database, table: &str) -> i64 {
    db.with_conn(|conn| {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
    })
    .unwrap()
}

fn clear_collection_id(db: &Database, folder_id: &str) {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE folders SET collection_id = NULL WHERE id = ?1",
            [folder_id],
        )?;
        Ok(())
    })
    .unwrap();
}

mod ordering_tests {
    use super::*;

    #[test]
    fn reorder_folder_swaps_siblings() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        assert_eq!(c.position, 0);

        let f1 = root_folder(&db, &c.id, "F1");
        let f2 = root_folder(&db, &c.id, "F2");
        assert_eq!(f1.position, 0);
        assert_eq!(f2.position, 1);

        let moved = db.reorder_folder(&f1.id, 1, OWNER).unwrap();
        assert_eq!(moved.position, 1);

        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        let order: Vec<(&str, i64)> = tree
            .folders
            .iter()
            .map(|f| (f.folder.name.as_str(), f.folder.position))
            .collect();
        assert_eq!(order, vec![("F2", 0), ("F1", 1)]);
    }

    #[test]
    fn reorder_rejects_out_of_range_position() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f1 = root_folder(&db, &c.id, "F1");
        root_folder(&db, &c.id, "F2");

        let err = db.reorder_folder(&f1.id, 2, OWNER).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPosition);
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = db.reorder_folder(&f1.id, -1, OWNER).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPosition);

        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        assert_eq!(tree.folders[0].folder.id, f1.id);
    }

    #[test]
    fn collections_reorder_within_workspace() {
        let (db, ws) = setup_db();
        let a = collection(&db, &ws, "A");
        collection(&db, &ws, "B");
        collection(&db, &ws, "C");

        db.reorder_collection(&a.id, 2, OWNER).unwrap();

        let names: Vec<String> = db
            .list_collections(&ws, OWNER)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn delete_compacts_remaining_siblings() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let a = item(&db, &c.id, None, ItemType::Doc, "a");
        let b = item(&db, &c.id, None, ItemType::Doc, "b");
        let last = item(&db, &c.id, None, ItemType::Doc, "c");

        db.delete_item(&b.id, OWNER).unwrap();

        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        let positions: Vec<(String, i64)> =
            tree.items.iter().map(|i| (i.id.clone(), i.position)).collect();
        assert_eq!(positions, vec![(a.id, 0), (last.id, 1)]);
    }

    #[test]
    fn items_and_folders_are_separate_groups() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f = root_folder(&db, &c.id, "F");
        let root_item = item(&db, &c.id, None, ItemType::Doc, "root");
        let nested = item(&db, &c.id, Some(&f.id), ItemType::Doc, "nested");

        assert_eq!(f.position, 0);
        assert_eq!(root_item.position, 0);
        assert_eq!(nested.position, 0);
    }
}

mod create_tests {
    use super::*;

    #[test]
    fn folder_requires_a_parent() {
        let (db, _ws) = setup_db();
        let err = db
            .create_folder(
                OWNER,
                NewFolder {
                    fields: ContainerFields::named("orphan"),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn item_parent_folder_must_share_collection() {
        let (db, ws) = setup_db();
        let c1 = collection(&db, &ws, "C1");
        let c2 = collection(&db, &ws, "C2");
        let f = root_folder(&db, &c2.id, "F");

        let err = db
            .create_item(
                OWNER,
                NewItem {
                    collection_id: c1.id.clone(),
                    parent_folder_id: Some(f.id.clone()),
                    item_type: ItemType::Doc,
                    fields: ContainerFields::named("x"),
                    columns: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ParentMismatch);
        assert_eq!(count(&db, "items"), 0);
    }

    #[test]
    fn stranger_naming_foreign_parent_is_forbidden() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f = root_folder(&db, &c.id, "F");

        db.upsert_user(Some("stranger".to_string()), "Stranger", None).unwrap();
        let own_ws = db.create_workspace("Mine", "stranger").unwrap();
        let own = db
            .create_collection(
                "stranger",
                NewCollection {
                    workspace_id: own_ws.id.clone(),
                    fields: ContainerFields::named("Mine"),
                },
            )
            .unwrap();

        let err = db
            .create_folder(
                "stranger",
                NewFolder {
                    collection_id: Some(own.id.clone()),
                    parent_folder_id: Some(f.id.clone()),
                    fields: ContainerFields::named("x"),
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccessDenied);

        let err = db
            .create_item(
                "stranger",
                NewItem {
                    collection_id: own.id.clone(),
                    parent_folder_id: Some(f.id.clone()),
                    item_type: ItemType::Doc,
                    fields: ContainerFields::named("x"),
                    columns: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccessDenied);
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(count(&db, "folders"), 1);
        assert_eq!(count(&db, "items"), 0);
    }

    #[test]
    fn missing_parent_is_not_found() {
        let (db, ws) = setup_db();
        collection(&db, &ws, "C");

        let err = db
            .create_folder(
                OWNER,
                NewFolder {
                    parent_folder_id: Some("missing".to_string()),
                    fields: ContainerFields::named("x"),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FolderNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn nested_folder_stores_resolved_collection() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let root = root_folder(&db, &c.id, "root");
        let child = child_folder(&db, &root.id, "child");

        assert_eq!(child.collection_id.as_deref(), Some(c.id.as_str()));
        assert_eq!(child.parent_folder_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(child.icon.as_deref(), Some("Folder"));
        assert_eq!(c.icon.as_deref(), Some("InboxStack"));
    }

    #[test]
    fn update_never_moves_the_node() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        root_folder(&db, &c.id, "first");
        let f = db
            .create_folder(
                OWNER,
                NewFolder {
                    collection_id: Some(c.id.clone()),
                    fields: ContainerFields {
                        description: Some("old".to_string()),
                        ..ContainerFields::named("second")
                    },
                    ..Default::default()
                },
            )
            .unwrap();

        let updated = db
            .update_folder(
                &f.id,
                ContainerPatch {
                    name: Some("renamed".to_string()),
                    description: Some(None),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.description, None);
        assert_eq!(updated.position, 1);
        assert_eq!(updated.collection_id, f.collection_id);
    }

    #[test]
    fn update_rejects_empty_name() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let err = db
            .update_collection(
                &c.id,
                ContainerPatch {
                    name: Some("  ".to_string()),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    }
}

mod resolution_tests {
    use super::*;

    #[test]
    fn deep_nodes_resolve_without_direct_collection() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let root = root_folder(&db, &c.id, "root");
        let mid = child_folder(&db, &root.id, "mid");
        let leaf = child_folder(&db, &mid.id, "leaf");
        let doc = item(&db, &c.id, Some(&leaf.id), ItemType::Doc, "doc");

        clear_collection_id(&db, &mid.id);
        clear_collection_id(&db, &leaf.id);
        db.with_conn(|conn| {
            conn.execute("UPDATE items SET collection_id = NULL WHERE id = ?1", [&doc.id])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.resolve_workspace(NodeRef::Folder(&leaf.id)).unwrap(), ws);
        assert_eq!(db.resolve_workspace(NodeRef::Item(&doc.id)).unwrap(), ws);

        // Nested folders are still materialized through parent links.
        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        assert_eq!(tree.descendant_counts(), (3, 1));
    }

    #[test]
    fn broken_chain_is_not_found() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let root = root_folder(&db, &c.id, "root");
        let child = child_folder(&db, &root.id, "child");

        clear_collection_id(&db, &root.id);
        clear_collection_id(&db, &child.id);

        let err = db.resolve_workspace(NodeRef::Folder(&child.id)).unwrap_err();
        assert_eq!(err.code, ErrorCode::BrokenAncestorChain);
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db.get_folder_tree(&child.id, OWNER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn stranger_is_forbidden_but_missing_node_is_not_found() {
        let (db, ws) = setup_db();
        db.upsert_user(Some("stranger".to_string()), "Stranger", None).unwrap();
        let c = collection(&db, &ws, "C");

        let err = db.get_collection_tree(&c.id, "stranger").unwrap_err();
        assert_eq!(err.code, ErrorCode::AccessDenied);
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = db.get_collection_tree("nope", "stranger").unwrap_err();
        assert_eq!(err.code, ErrorCode::CollectionNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);

        db.add_member(&ws, OWNER, "stranger").unwrap();
        assert!(db.get_collection_tree(&c.id, "stranger").is_ok());
    }
}

mod move_tests {
    use super::*;

    #[test]
    fn cross_workspace_item_move_is_rejected() {
        let (db, ws1) = setup_db();
        let ws2 = db.create_workspace("Other", OWNER).unwrap().id;
        let c1 = collection(&db, &ws1, "C1");
        let c2 = collection(&db, &ws2, "C2");
        item(&db, &c1.id, None, ItemType::Doc, "before");
        let i = item(&db, &c1.id, None, ItemType::List, "I");

        let err = db
            .move_item(
                &i.id,
                MoveTarget {
                    collection_id: Some(c2.id.clone()),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CrossWorkspaceMove);
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let tree = db.get_collection_tree(&c1.id, OWNER).unwrap();
        let kept = tree.items.iter().find(|x| x.id == i.id).unwrap();
        assert_eq!(kept.position, 1);
        assert!(db.get_collection_tree(&c2.id, OWNER).unwrap().items.is_empty());
    }

    #[test]
    fn cross_workspace_folder_move_is_rejected() {
        let (db, ws1) = setup_db();
        let ws2 = db.create_workspace("Other", OWNER).unwrap().id;
        let c1 = collection(&db, &ws1, "C1");
        let c2 = collection(&db, &ws2, "C2");
        root_folder(&db, &c1.id, "before");
        let f = root_folder(&db, &c1.id, "F");
        let target = root_folder(&db, &c2.id, "target");

        for destination in [
            MoveTarget {
                collection_id: Some(c2.id.clone()),
                ..Default::default()
            },
            MoveTarget {
                parent_folder_id: Some(target.id.clone()),
                position: Some(0),
                ..Default::default()
            },
        ] {
            let err = db.move_folder(&f.id, destination, OWNER).unwrap_err();
            assert_eq!(err.code, ErrorCode::CrossWorkspaceMove);
            assert_eq!(err.kind(), ErrorKind::BadRequest);
        }

        let t1 = db.get_collection_tree(&c1.id, OWNER).unwrap();
        let source: Vec<(&str, i64)> = t1
            .folders
            .iter()
            .map(|x| (x.folder.name.as_str(), x.folder.position))
            .collect();
        assert_eq!(source, vec![("before", 0), ("F", 1)]);

        let t2 = db.get_collection_tree(&c2.id, OWNER).unwrap();
        assert_eq!(t2.folders.len(), 1);
        assert_eq!(t2.folders[0].folder.position, 0);
        assert!(t2.folders[0].child_folders.is_empty());
    }

    #[test]
    fn move_item_between_folders_compacts_source() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let src = root_folder(&db, &c.id, "src");
        let dst = root_folder(&db, &c.id, "dst");
        let a = item(&db, &c.id, Some(&src.id), ItemType::Doc, "a");
        let b = item(&db, &c.id, Some(&src.id), ItemType::Doc, "b");
        let x = item(&db, &c.id, Some(&dst.id), ItemType::Doc, "x");

        let moved = db
            .move_item(
                &a.id,
                MoveTarget {
                    parent_folder_id: Some(dst.id.clone()),
                    position: Some(0),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap();
        assert_eq!(moved.position, 0);
        assert_eq!(moved.parent_folder_id.as_deref(), Some(dst.id.as_str()));

        let src_tree = db.get_folder_tree(&src.id, OWNER).unwrap();
        assert_eq!(src_tree.items.len(), 1);
        assert_eq!((src_tree.items[0].id.as_str(), src_tree.items[0].position), (b.id.as_str(), 0));

        let dst_tree = db.get_folder_tree(&dst.id, OWNER).unwrap();
        let order: Vec<(&str, i64)> = dst_tree
            .items
            .iter()
            .map(|i| (i.id.as_str(), i.position))
            .collect();
        assert_eq!(order, vec![(a.id.as_str(), 0), (x.id.as_str(), 1)]);
    }

    #[test]
    fn move_without_position_appends() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f = root_folder(&db, &c.id, "F");
        item(&db, &c.id, Some(&f.id), ItemType::Doc, "x");
        let i = item(&db, &c.id, None, ItemType::Doc, "i");

        let moved = db
            .move_item(
                &i.id,
                MoveTarget {
                    parent_folder_id: Some(f.id.clone()),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap();
        assert_eq!(moved.position, 1);
    }

    #[test]
    fn move_beyond_end_leaves_everything_in_place() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f = root_folder(&db, &c.id, "F");
        let i = item(&db, &c.id, None, ItemType::Doc, "i");

        let err = db
            .move_item(
                &i.id,
                MoveTarget {
                    parent_folder_id: Some(f.id.clone()),
                    position: Some(1),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPosition);

        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        assert_eq!(tree.items.len(), 1);
        assert!(tree.folders[0].items.is_empty());
    }

    #[test]
    fn missing_target_is_bad_request() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f = root_folder(&db, &c.id, "F");

        let err = db.move_folder(&f.id, MoveTarget::default(), OWNER).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
    }

    #[test]
    fn folder_cannot_move_under_itself_or_descendant() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let root = root_folder(&db, &c.id, "root");
        let child = child_folder(&db, &root.id, "child");
        let grandchild = child_folder(&db, &child.id, "grandchild");

        for target in [&root.id, &grandchild.id] {
            let err = db
                .move_folder(
                    &root.id,
                    MoveTarget {
                        parent_folder_id: Some(target.clone()),
                        ..Default::default()
                    },
                    OWNER,
                )
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::CycleDetected);
        }

        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        assert_eq!(tree.folders.len(), 1);
        assert_eq!(tree.descendant_counts(), (3, 0));
    }

    #[test]
    fn folder_move_carries_subtree_to_new_collection() {
        let (db, ws) = setup_db();
        let c1 = collection(&db, &ws, "C1");
        let c2 = collection(&db, &ws, "C2");
        let root = root_folder(&db, &c1.id, "root");
        let child = child_folder(&db, &root.id, "child");
        item(&db, &c1.id, Some(&child.id), ItemType::Doc, "doc");
        let stays = root_folder(&db, &c1.id, "stays");

        db.move_folder(
            &root.id,
            MoveTarget {
                collection_id: Some(c2.id.clone()),
                ..Default::default()
            },
            OWNER,
        )
        .unwrap();

        let t1 = db.get_collection_tree(&c1.id, OWNER).unwrap();
        assert_eq!(t1.folders.len(), 1);
        assert_eq!((t1.folders[0].folder.id.as_str(), t1.folders[0].folder.position), (stays.id.as_str(), 0));

        let t2 = db.get_collection_tree(&c2.id, OWNER).unwrap();
        assert_eq!(t2.descendant_counts(), (2, 1));

        let moved_child = db.get_folder_tree(&child.id, OWNER).unwrap();
        assert_eq!(moved_child.folder.collection_id.as_deref(), Some(c2.id.as_str()));
        assert_eq!(moved_child.items[0].collection_id.as_deref(), Some(c2.id.as_str()));
    }
}

mod depth_tests {
    use super::*;

    /// Chain of folders `L1 > L2 > ... > Ln` under a fresh collection.
    fn chain(db: &Database, collection_id: &str, levels: usize) -> Vec<Folder> {
        let mut folders = vec![root_folder(db, collection_id, "L1")];
        for level in 2..=levels {
            let parent = folders[folders.len() - 1].id.clone();
            folders.push(child_folder(db, &parent, &format!("L{}", level)));
        }
        folders
    }

    #[test]
    fn folders_past_the_limit_are_rejected() {
        let (db, ws) = setup_db();
        let db = db.with_max_depth(3);
        let c = collection(&db, &ws, "C");
        let levels = chain(&db, &c.id, 3);

        let err = db
            .create_folder(
                OWNER,
                NewFolder {
                    parent_folder_id: Some(levels[2].id.clone()),
                    fields: ContainerFields::named("L4"),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DepthExceeded);
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        // Items do not count as a level.
        item(&db, &c.id, Some(&levels[2].id), ItemType::Doc, "leaf doc");
        assert_eq!(count(&db, "folders"), 3);
    }

    #[test]
    fn tree_at_the_limit_can_be_duplicated() {
        let (db, ws) = setup_db();
        let db = db.with_max_depth(3);
        let c = collection(&db, &ws, "C");
        let levels = chain(&db, &c.id, 3);
        item(&db, &c.id, Some(&levels[2].id), ItemType::List, "deep list");

        let copy = db.duplicate_collection(&c.id, OWNER).unwrap();
        assert_eq!(copy.descendant_counts(), (3, 1));

        let nested = db.duplicate_folder(&levels[1].id, OWNER).unwrap();
        assert_eq!(nested.folder.name, "L2-copy");
        assert_eq!(nested.descendant_counts(), (1, 1));
    }

    #[test]
    fn move_counts_the_height_of_the_moved_subtree() {
        let (db, ws) = setup_db();
        let db = db.with_max_depth(3);
        let c = collection(&db, &ws, "C");
        let levels = chain(&db, &c.id, 2);
        let other = root_folder(&db, &c.id, "other");
        child_folder(&db, &other.id, "other child");

        let err = db
            .move_folder(
                &other.id,
                MoveTarget {
                    parent_folder_id: Some(levels[1].id.clone()),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DepthExceeded);

        let moved = db
            .move_folder(
                &other.id,
                MoveTarget {
                    parent_folder_id: Some(levels[0].id.clone()),
                    ..Default::default()
                },
                OWNER,
            )
            .unwrap();
        assert_eq!(moved.parent_folder_id.as_deref(), Some(levels[0].id.as_str()));
        assert_eq!(moved.position, 1);

        let copy = db.duplicate_collection(&c.id, OWNER).unwrap();
        assert_eq!(copy.descendant_counts(), (4, 0));
    }
}

mod cascade_tests {
    use super::*;

    #[test]
    fn deleting_collection_removes_whole_subtree() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f = root_folder(&db, &c.id, "F");
        let sub = child_folder(&db, &f.id, "sub");
        item(&db, &c.id, Some(&sub.id), ItemType::List, "list");
        item(&db, &c.id, Some(&f.id), ItemType::Doc, "doc");

        assert_eq!(count(&db, "kanban_boards"), 1);
        assert_eq!(count(&db, "kanban_columns"), 3);
        assert_eq!(count(&db, "kanban_tasks"), 1);

        db.delete_collection(&c.id, OWNER).unwrap();

        for table in [
            "collections",
            "folders",
            "items",
            "kanban_boards",
            "kanban_columns",
            "kanban_tasks",
        ] {
            assert_eq!(count(&db, table), 0, "{} should be empty", table);
        }
    }

    #[test]
    fn deleting_folder_keeps_siblings_contiguous() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        root_folder(&db, &c.id, "a");
        let b = root_folder(&db, &c.id, "b");
        child_folder(&db, &b.id, "b1");
        root_folder(&db, &c.id, "c");

        db.delete_folder(&b.id, OWNER).unwrap();

        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        let order: Vec<(&str, i64)> = tree
            .folders
            .iter()
            .map(|f| (f.folder.name.as_str(), f.folder.position))
            .collect();
        assert_eq!(order, vec![("a", 0), ("c", 1)]);
        assert_eq!(count(&db, "folders"), 2);
    }
}

mod duplicate_tests {
    use super::*;

    #[test]
    fn collection_duplicate_is_isomorphic() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "Plans");
        let a = root_folder(&db, &c.id, "A");
        let b = child_folder(&db, &a.id, "B");
        root_folder(&db, &c.id, "Z");
        let list = item(&db, &c.id, Some(&b.id), ItemType::List, "Sprint");
        item(&db, &c.id, None, ItemType::Doc, "Notes");
        item(&db, &c.id, None, ItemType::Whiteboard, "Sketch");

        let column = db.get_board(&list.id, OWNER).unwrap().columns[0].id.clone();
        let parent = db
            .create_task(
                OWNER,
                playground_tree::types::NewTask {
                    kanban_column_id: column.clone(),
                    title: "parent".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        db.create_task(
            OWNER,
            playground_tree::types::NewTask {
                kanban_column_id: column,
                title: "child".to_string(),
                parent_task_id: Some(parent.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();

        let original = db.get_collection_tree(&c.id, OWNER).unwrap();
        let copy = db.duplicate_collection(&c.id, OWNER).unwrap();

        assert_eq!(copy.collection.name, "Plans-copy");
        assert_eq!(copy.collection.position, 1);
        assert_ne!(copy.collection.id, c.id);
        assert_eq!(copy.descendant_counts(), original.descendant_counts());

        let names: Vec<&str> = copy.folders.iter().map(|f| f.folder.name.as_str()).collect();
        assert_eq!(names, vec!["A", "Z"]);
        let item_names: Vec<(&str, i64)> = copy
            .items
            .iter()
            .map(|i| (i.name.as_str(), i.position))
            .collect();
        assert_eq!(item_names, vec![("Notes", 0), ("Sketch", 1)]);

        let copied_b = &copy.folders[0].child_folders[0];
        assert_eq!(copied_b.folder.name, "B");
        assert_ne!(copied_b.folder.id, b.id);
        let copied_list = &copied_b.items[0];
        assert_ne!(copied_list.id, list.id);

        let original_board = db.get_board(&list.id, OWNER).unwrap();
        let copied_board = db.get_board(&copied_list.id, OWNER).unwrap();
        assert_ne!(copied_board.id, original_board.id);
        let shape = |board: &playground_tree::types::BoardView| -> Vec<(String, i64, Vec<(String, usize)>)> {
            board
                .columns
                .iter()
                .map(|col| {
                    (
                        col.title.clone(),
                        col.position,
                        col.cards
                            .iter()
                            .map(|card| (card.title.clone(), card.subtasks.len()))
                            .collect(),
                    )
                })
                .collect()
        };
        assert_eq!(shape(&copied_board), shape(&original_board));
        assert_eq!(count(&db, "kanban_tasks"), 6);
    }

    #[test]
    fn folder_duplicate_appends_sibling() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let f = root_folder(&db, &c.id, "F");
        root_folder(&db, &c.id, "G");
        child_folder(&db, &f.id, "inner");
        item(&db, &c.id, Some(&f.id), ItemType::Doc, "doc");

        let copy = db.duplicate_folder(&f.id, OWNER).unwrap();
        assert_eq!(copy.folder.name, "F-copy");
        assert_eq!(copy.folder.position, 2);
        assert_eq!(copy.child_folders[0].folder.name, "inner");
        assert_eq!(copy.items[0].name, "doc");
        assert_eq!(copy.descendant_counts(), (1, 1));

        let tree = db.get_collection_tree(&c.id, OWNER).unwrap();
        let positions: Vec<i64> = tree.folders.iter().map(|f| f.folder.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn item_duplicate_copies_board() {
        let (db, ws) = setup_db();
        let c = collection(&db, &ws, "C");
        let list = item(&db, &c.id, None, ItemType::List, "L");

        let copy = db.duplicate_item(&list.id, OWNER).unwrap();
        assert_eq!(copy.item.name, "L-copy");
        assert_eq!(copy.item.position, 1);
        assert!(copy.kanban_board_id.is_some());

        let board = db.get_board(&copy.item.id, OWNER).unwrap();
        assert_eq!(board.columns.len(), 3);
        assert_eq!(board.columns[0].cards[0].title, "hello world");
    }
}
