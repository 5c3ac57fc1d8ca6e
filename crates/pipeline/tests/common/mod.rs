//! In-memory store double shared by the pipeline integration tests.
//!
//! Mirrors the SQLite store closely enough for the pipeline: last-child
//! inserts shift the nested set, rebuild renumbers from parent edges, the
//! ledger table only exists once created. A few switches simulate a
//! misbehaving store.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use taxonomy_core::entry::{DecodeContext, EntryBatch};
use taxonomy_core::nested_set::{compute_layout, AliasEdge, NestedSetRow, ParentEdge};
use taxonomy_core::node::{NewNode, Node};
use taxonomy_core::store::{NodeStore, StoreError, TrackingStore};
use taxonomy_core::tracking::{NewTrackingRecord, TrackingRecord};
use taxonomy_core::types::{DbId, ROOT_ALIAS, ROOT_ID, ROOT_PARENT_ID};

#[derive(Default)]
struct State {
    nodes: BTreeMap<DbId, Node>,
    next_id: DbId,
    tracking: Option<Vec<TrackingRecord>>,
    next_tracking_id: DbId,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// On the next rebuild, move `.0` under `.1` after renumbering.
    drift_once: Mutex<Option<(DbId, DbId)>>,
    /// Every rebuild reports failure.
    pub fail_rebuild: AtomicBool,
    /// Every ledger insert fails.
    pub fail_tracking: AtomicBool,
    /// Every node insert fails with a backend error.
    pub fail_insert: AtomicBool,
    pub rebuild_calls: AtomicUsize,
}

fn root_node() -> Node {
    let now = chrono::Utc::now();
    Node {
        id: ROOT_ID,
        parent_id: ROOT_PARENT_ID,
        lft: 0,
        rgt: 1,
        level: 0,
        path: String::new(),
        title: "ROOT".into(),
        alias: ROOT_ALIAS.into(),
        description: String::new(),
        note: String::new(),
        meta_description: String::new(),
        meta_keywords: String::new(),
        published: true,
        access: 1,
        language: "*".into(),
        created_user_id: 0,
        created_time: now,
        modified_user_id: 0,
        modified_time: now,
        hits: 0,
        version: 1,
    }
}

impl MemoryStore {
    /// A store holding only the root sentinel.
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.nodes.insert(ROOT_ID, root_node());
            state.next_id = ROOT_ID + 1;
            state.next_tracking_id = 1;
        }
        store
    }

    pub fn drift_on_next_rebuild(&self, id: DbId, wrong_parent: DbId) {
        *self.drift_once.lock().unwrap() = Some((id, wrong_parent));
    }

    /// Overwrite a parent id without touching coordinates.
    pub fn set_parent(&self, id: DbId, parent_id: DbId) {
        let mut state = self.state.lock().unwrap();
        state.nodes.get_mut(&id).expect("node exists").parent_id = parent_id;
    }

    /// Overwrite coordinates directly.
    pub fn set_range(&self, id: DbId, lft: i64, rgt: i64) {
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.get_mut(&id).expect("node exists");
        node.lft = lft;
        node.rgt = rgt;
    }

    pub fn node(&self, id: DbId) -> Node {
        self.state.lock().unwrap().nodes[&id].clone()
    }

    pub fn node_by_alias(&self, alias: &str) -> Node {
        self.state
            .lock()
            .unwrap()
            .nodes
            .values()
            .find(|n| n.alias == alias)
            .cloned()
            .unwrap_or_else(|| panic!("no node with alias {alias}"))
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .nodes
            .values()
            .any(|n| n.alias == alias)
    }

    pub fn all_nodes(&self) -> Vec<Node> {
        self.state.lock().unwrap().nodes.values().cloned().collect()
    }

    pub fn rows(&self) -> Vec<NestedSetRow> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .values()
            .map(|n| NestedSetRow {
                id: n.id,
                parent_id: n.parent_id,
                lft: n.lft,
                rgt: n.rgt,
                level: n.level,
                title: n.title.clone(),
            })
            .collect()
    }

    /// Insert a node directly, bypassing the pipeline.
    pub fn seed(&self, alias: &str, parent_id: DbId) -> DbId {
        let (level, path) = {
            let state = self.state.lock().unwrap();
            let parent = &state.nodes[&parent_id];
            let path = if parent.path.is_empty() {
                alias.to_string()
            } else {
                format!("{}/{alias}", parent.path)
            };
            (parent.level + 1, path)
        };
        let now = chrono::Utc::now();
        let new = NewNode {
            parent_id,
            level,
            path,
            title: alias.to_uppercase(),
            alias: alias.to_string(),
            description: String::new(),
            note: String::new(),
            meta_description: String::new(),
            meta_keywords: String::new(),
            published: true,
            access: 1,
            language: "*".into(),
            created_user_id: 0,
            created_time: now,
            modified_user_id: 0,
            modified_time: now,
        };
        self.insert(&new).expect("seed insert")
    }

    fn insert(&self, node: &NewNode) -> Result<DbId, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.nodes.values().any(|n| n.alias == node.alias) {
            return Err(StoreError::DuplicateAlias(node.alias.clone()));
        }
        let parent_rgt = state
            .nodes
            .get(&node.parent_id)
            .map(|p| p.rgt)
            .ok_or(StoreError::NotFound(node.parent_id))?;

        for n in state.nodes.values_mut() {
            if n.rgt >= parent_rgt {
                n.rgt += 2;
            }
            if n.lft > parent_rgt {
                n.lft += 2;
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        state.nodes.insert(
            id,
            Node {
                id,
                parent_id: node.parent_id,
                lft: parent_rgt,
                rgt: parent_rgt + 1,
                level: node.level,
                path: node.path.clone(),
                title: node.title.clone(),
                alias: node.alias.clone(),
                description: node.description.clone(),
                note: node.note.clone(),
                meta_description: node.meta_description.clone(),
                meta_keywords: node.meta_keywords.clone(),
                published: node.published,
                access: node.access,
                language: node.language.clone(),
                created_user_id: node.created_user_id,
                created_time: node.created_time,
                modified_user_id: node.modified_user_id,
                modified_time: node.modified_time,
                hits: 0,
                version: 1,
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn find_node(&self, id: DbId) -> Result<Option<Node>, StoreError> {
        Ok(self.state.lock().unwrap().nodes.get(&id).cloned())
    }

    async fn find_by_alias(&self, alias: &str) -> Result<Option<Node>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nodes
            .values()
            .find(|n| n.alias == alias)
            .cloned())
    }

    async fn insert_node(&self, node: &NewNode) -> Result<DbId, StoreError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.insert(node)
    }

    async fn update_parent(&self, id: DbId, parent_id: DbId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        node.parent_id = parent_id;
        Ok(())
    }

    async fn update_path(&self, id: DbId, path: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        node.path = path.to_string();
        Ok(())
    }

    async fn delete_nodes(&self, ids: &[DbId]) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut deleted = 0;
        for id in ids {
            if *id != ROOT_ID && state.nodes.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn parent_edges(&self) -> Result<Vec<ParentEdge>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nodes
            .values()
            .map(|n| ParentEdge {
                id: n.id,
                parent_id: n.parent_id,
                lft: n.lft,
            })
            .collect())
    }

    async fn alias_edges(&self) -> Result<Vec<AliasEdge>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nodes
            .values()
            .map(|n| AliasEdge {
                id: n.id,
                parent_id: n.parent_id,
                lft: n.lft,
                alias: n.alias.clone(),
                path: n.path.clone(),
            })
            .collect())
    }

    async fn nested_set_rows(&self) -> Result<Vec<NestedSetRow>, StoreError> {
        let mut rows = self.rows();
        rows.sort_by_key(|r| (r.lft, r.id));
        Ok(rows)
    }

    async fn rebuild(&self, root_id: DbId) -> Result<bool, StoreError> {
        self.rebuild_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_rebuild.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let edges = self.parent_edges().await?;
        let mut state = self.state.lock().unwrap();
        if !state.nodes.contains_key(&root_id) {
            return Ok(false);
        }

        let layout = compute_layout(root_id, &edges);
        for p in &layout.placements {
            if let Some(node) = state.nodes.get_mut(&p.id) {
                node.lft = p.lft;
                node.rgt = p.rgt;
                node.level = p.level;
            }
        }
        for id in &layout.detached {
            if let Some(node) = state.nodes.get_mut(id) {
                node.lft = 0;
                node.rgt = 0;
            }
        }

        if let Some((id, wrong_parent)) = self.drift_once.lock().unwrap().take() {
            if let Some(node) = state.nodes.get_mut(&id) {
                node.parent_id = wrong_parent;
            }
        }
        Ok(true)
    }

    async fn ensure_root(&self) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.nodes.get_mut(&ROOT_ID) {
            None => {
                state.nodes.insert(ROOT_ID, root_node());
                Ok(true)
            }
            Some(root) if root.parent_id != ROOT_PARENT_ID || root.level != 0 => {
                root.parent_id = ROOT_PARENT_ID;
                root.level = 0;
                root.path.clear();
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    async fn count_nodes(&self) -> Result<i64, StoreError> {
        Ok(self.state.lock().unwrap().nodes.len() as i64 - 1)
    }

    async fn published_nodes(&self) -> Result<Vec<Node>, StoreError> {
        let mut nodes: Vec<Node> = self
            .state
            .lock()
            .unwrap()
            .nodes
            .values()
            .filter(|n| n.id != ROOT_ID && n.published)
            .cloned()
            .collect();
        nodes.sort_by_key(|n| (n.lft, n.id));
        Ok(nodes)
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn tracking_table_exists(&self) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().tracking.is_some())
    }

    async fn ensure_tracking_table(&self) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .tracking
            .get_or_insert_with(Vec::new);
        Ok(())
    }

    async fn insert_tracking(&self, record: &NewTrackingRecord) -> Result<DbId, StoreError> {
        if self.fail_tracking.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("ledger is read-only".into()));
        }
        let mut state = self.state.lock().unwrap();
        let id = state.next_tracking_id;
        state.next_tracking_id += 1;
        let ledger = state
            .tracking
            .as_mut()
            .ok_or(StoreError::TrackingUnavailable)?;
        ledger.push(TrackingRecord {
            id,
            node_id: record.node_id,
            original_alias: record.original_alias.clone(),
            imported_date: record.imported_date,
            imported_by: record.imported_by,
            source_payload: record.source_payload.clone(),
        });
        Ok(id)
    }

    async fn tracked_node_ids(&self) -> Result<Vec<DbId>, StoreError> {
        let state = self.state.lock().unwrap();
        let ledger = state
            .tracking
            .as_ref()
            .ok_or(StoreError::TrackingUnavailable)?;
        Ok(ledger.iter().map(|r| r.node_id).collect())
    }

    async fn list_tracking(&self) -> Result<Vec<TrackingRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tracking
            .clone()
            .unwrap_or_default())
    }

    async fn count_tracking(&self) -> Result<i64, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tracking
            .as_ref()
            .map_or(0, |t| t.len() as i64))
    }

    async fn clear_tracking(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let ledger = state
            .tracking
            .as_mut()
            .ok_or(StoreError::TrackingUnavailable)?;
        let cleared = ledger.len() as u64;
        ledger.clear();
        Ok(cleared)
    }
}

/// Decode a JSON literal into a batch with a fixed actor.
pub fn batch(doc: Value) -> EntryBatch {
    EntryBatch::from_value(&doc, &DecodeContext::new(7)).expect("valid document")
}
