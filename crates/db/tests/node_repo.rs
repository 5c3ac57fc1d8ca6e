use assert_matches::assert_matches;
use sqlx::SqlitePool;
use taxonomy_core::nested_set::find_violations;
use taxonomy_core::node::NewNode;
use taxonomy_core::store::{NodeStore, StoreError};
use taxonomy_core::types::{DbId, ROOT_ID};
use taxonomy_db::models::node::CoordinateRow;
use taxonomy_db::repositories::NodeRepo;
use taxonomy_db::SqliteTaxonomyStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_node(alias: &str, parent_id: DbId, level: i32, path: &str) -> NewNode {
    let now = chrono::Utc::now();
    NewNode {
        parent_id,
        level,
        path: path.to_string(),
        title: alias.to_uppercase(),
        alias: alias.to_string(),
        description: String::new(),
        note: String::new(),
        meta_description: String::new(),
        meta_keywords: String::new(),
        published: true,
        access: 1,
        language: "*".to_string(),
        created_user_id: 0,
        created_time: now,
        modified_user_id: 0,
        modified_time: now,
    }
}

async fn coordinates(pool: &SqlitePool) -> Vec<taxonomy_core::nested_set::NestedSetRow> {
    NodeRepo::list_coordinates(pool)
        .await
        .unwrap()
        .into_iter()
        .map(Into::into)
        .collect()
}

async fn coordinate(pool: &SqlitePool, id: DbId) -> CoordinateRow {
    NodeRepo::list_coordinates(pool)
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("node {id} missing"))
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Migrations create the table and seed the root sentinel.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bootstrap_seeds_root(pool: SqlitePool) {
    taxonomy_db::health_check(&pool).await.unwrap();

    let root = NodeRepo::find_by_id(&pool, ROOT_ID).await.unwrap().unwrap();
    assert_eq!(root.parent_id, 0);
    assert_eq!(root.level, 0);
    assert_eq!(root.path, "");
    assert_eq!((root.lft, root.rgt), (0, 1));
    assert_eq!(NodeRepo::count_non_root(&pool).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Last-child insert
// ---------------------------------------------------------------------------

/// Children are appended after existing siblings and the set stays valid.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_last_child_keeps_nested_set(pool: SqlitePool) {
    let electronics =
        NodeRepo::insert_last_child(&pool, &new_node("electronics", ROOT_ID, 1, "electronics"))
            .await
            .unwrap();
    let books = NodeRepo::insert_last_child(&pool, &new_node("books", ROOT_ID, 1, "books"))
        .await
        .unwrap();
    let phones = NodeRepo::insert_last_child(
        &pool,
        &new_node("phones", electronics, 2, "electronics/phones"),
    )
    .await
    .unwrap();

    let e = coordinate(&pool, electronics).await;
    let b = coordinate(&pool, books).await;
    let p = coordinate(&pool, phones).await;
    let root = coordinate(&pool, ROOT_ID).await;

    assert_eq!((e.lft, e.rgt), (1, 4));
    assert_eq!((p.lft, p.rgt), (2, 3));
    assert_eq!((b.lft, b.rgt), (5, 6));
    assert_eq!((root.lft, root.rgt), (0, 7));
    assert!(find_violations(ROOT_ID, &coordinates(&pool).await).is_empty());
}

/// Inserting under a missing parent writes nothing.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_under_missing_parent(pool: SqlitePool) {
    let store = SqliteTaxonomyStore::new(pool.clone());
    let result = store.insert_node(&new_node("orphan", 999, 1, "orphan")).await;
    assert_matches!(result, Err(StoreError::NotFound(999)));
    assert_eq!(NodeRepo::count_non_root(&pool).await.unwrap(), 0);
    assert_eq!(coordinate(&pool, ROOT_ID).await.rgt, 1);
}

/// The unique alias constraint surfaces as a duplicate and rolls back the shift.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_alias_is_reported(pool: SqlitePool) {
    let store = SqliteTaxonomyStore::new(pool.clone());
    store
        .insert_node(&new_node("phones", ROOT_ID, 1, "phones"))
        .await
        .unwrap();

    let result = store.insert_node(&new_node("phones", ROOT_ID, 1, "phones")).await;
    assert_matches!(result, Err(StoreError::DuplicateAlias(alias)) if alias == "phones");
    assert_eq!(coordinate(&pool, ROOT_ID).await.rgt, 3);
}

/// Concurrent inserts on separate connections all land, and a racing
/// duplicate is reported as a duplicate rather than a locking error.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_inserts_serialize(pool: SqlitePool) {
    let store = SqliteTaxonomyStore::new(pool.clone());
    let aliases = ["a", "b", "c", "d", "e", "f", "shared", "shared"];

    let inserts = aliases.iter().map(|alias| {
        let store = store.clone();
        let node = new_node(alias, ROOT_ID, 1, alias);
        tokio::spawn(async move { store.insert_node(&node).await })
    });
    let mut created = 0;
    let mut duplicates = 0;
    for handle in inserts.collect::<Vec<_>>() {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::DuplicateAlias(alias)) => {
                assert_eq!(alias, "shared");
                duplicates += 1;
            }
            Err(other) => panic!("unexpected insert failure: {other}"),
        }
    }

    assert_eq!((created, duplicates), (7, 1));
    assert_eq!(NodeRepo::count_non_root(&pool).await.unwrap(), 7);
    assert_eq!(coordinate(&pool, ROOT_ID).await.rgt, 15);
    assert!(find_violations(ROOT_ID, &coordinates(&pool).await).is_empty());
}

/// Paths over the column width are rejected by the check constraint.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_overlong_path_is_rejected(pool: SqlitePool) {
    let store = SqliteTaxonomyStore::new(pool);
    let long = "p".repeat(300);
    let result = store.insert_node(&new_node("long", ROOT_ID, 1, &long)).await;
    assert_matches!(result, Err(StoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Rebuild
// ---------------------------------------------------------------------------

/// Rebuild renumbers from parent_id after a re-parent.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rebuild_follows_parent_edges(pool: SqlitePool) {
    let a = NodeRepo::insert_last_child(&pool, &new_node("a", ROOT_ID, 1, "a"))
        .await
        .unwrap();
    let b = NodeRepo::insert_last_child(&pool, &new_node("b", ROOT_ID, 1, "b"))
        .await
        .unwrap();

    NodeRepo::update_parent(&pool, b, a).await.unwrap();
    assert!(NodeRepo::rebuild(&pool, ROOT_ID).await.unwrap());

    let b_row = coordinate(&pool, b).await;
    let a_row = coordinate(&pool, a).await;
    assert_eq!(b_row.parent_id, a);
    assert_eq!(b_row.level, 2);
    assert!(a_row.lft < b_row.lft && b_row.rgt < a_row.rgt);
    assert!(find_violations(ROOT_ID, &coordinates(&pool).await).is_empty());
}

/// Nodes cut off from the root collapse to an empty range.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rebuild_collapses_detached_nodes(pool: SqlitePool) {
    let a = NodeRepo::insert_last_child(&pool, &new_node("a", ROOT_ID, 1, "a"))
        .await
        .unwrap();
    NodeRepo::update_parent(&pool, a, 4242).await.unwrap();

    assert!(NodeRepo::rebuild(&pool, ROOT_ID).await.unwrap());
    let row = coordinate(&pool, a).await;
    assert_eq!((row.lft, row.rgt), (0, 0));
    assert_eq!(find_violations(ROOT_ID, &coordinates(&pool).await).len(), 1);
}

/// Rebuilding under an unknown root reports failure instead of erroring.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rebuild_unknown_root(pool: SqlitePool) {
    assert!(!NodeRepo::rebuild(&pool, 777).await.unwrap());
}

// ---------------------------------------------------------------------------
// Root maintenance and deletes
// ---------------------------------------------------------------------------

/// A missing root is recreated; a drifted root is repaired.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ensure_root(pool: SqlitePool) {
    assert!(!NodeRepo::ensure_root(&pool).await.unwrap());

    sqlx::query("UPDATE taxonomy_nodes SET parent_id = 5, level = 3 WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();
    assert!(NodeRepo::ensure_root(&pool).await.unwrap());
    let root = NodeRepo::find_by_id(&pool, ROOT_ID).await.unwrap().unwrap();
    assert_eq!((root.parent_id, root.level), (0, 0));

    sqlx::query("DELETE FROM taxonomy_nodes WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();
    assert!(NodeRepo::ensure_root(&pool).await.unwrap());
    assert!(NodeRepo::find_by_alias(&pool, "root").await.unwrap().is_some());
}

/// Bulk delete never removes the root.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_many_spares_root(pool: SqlitePool) {
    let a = NodeRepo::insert_last_child(&pool, &new_node("a", ROOT_ID, 1, "a"))
        .await
        .unwrap();
    let b = NodeRepo::insert_last_child(&pool, &new_node("b", ROOT_ID, 1, "b"))
        .await
        .unwrap();

    let deleted = NodeRepo::delete_many(&pool, &[ROOT_ID, a, b, 9999]).await.unwrap();
    assert_eq!(deleted, 2);
    assert!(NodeRepo::find_by_id(&pool, ROOT_ID).await.unwrap().is_some());
}

/// Published listing is in tree order and excludes the root.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_published_in_tree_order(pool: SqlitePool) {
    let a = NodeRepo::insert_last_child(&pool, &new_node("a", ROOT_ID, 1, "a"))
        .await
        .unwrap();
    let mut hidden = new_node("hidden", ROOT_ID, 1, "hidden");
    hidden.published = false;
    NodeRepo::insert_last_child(&pool, &hidden).await.unwrap();
    NodeRepo::insert_last_child(&pool, &new_node("a-child", a, 2, "a/a-child"))
        .await
        .unwrap();

    let aliases: Vec<String> = NodeRepo::list_published(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.alias)
        .collect();
    assert_eq!(aliases, vec!["a", "a-child"]);
}
