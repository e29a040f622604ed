//! In-Memory Transactional Node Store
//!
//! `MemoryNodeStore` is the reference `NodeStore` implementation used by tests,
//! benches and embedders that do not need persistence. It provides optimistic
//! concurrency: every document carries a version, a transaction remembers the
//! versions it observed, and commit fails if any of them moved.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::DatabaseError;
use super::node_store::{NodeStore, NodeTransaction};
use crate::models::{ChangelogEntry, Node, NodePatch};

#[derive(Debug, Default)]
struct StoreState {
    nodes: HashMap<String, VersionedNode>,
    changelog: Vec<ChangelogEntry>,
}

#[derive(Debug, Clone)]
struct VersionedNode {
    version: u64,
    node: Node,
}

/// Shared in-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node outside any transaction
    pub async fn insert(&self, node: Node) {
        let mut state = self.state.write().await;
        let version = state
            .nodes
            .get(&node.id)
            .map(|existing| existing.version + 1)
            .unwrap_or(0);
        state
            .nodes
            .insert(node.id.clone(), VersionedNode { version, node });
    }

    /// Read the committed state of a node
    pub async fn get(&self, id: &str) -> Option<Node> {
        self.state
            .read()
            .await
            .nodes
            .get(id)
            .map(|entry| entry.node.clone())
    }

    /// Committed audit records for one node, oldest first
    pub async fn changelog_for(&self, node_id: &str) -> Vec<ChangelogEntry> {
        self.state
            .read()
            .await
            .changelog
            .iter()
            .filter(|entry| entry.node_id == node_id)
            .cloned()
            .collect()
    }

    /// Every committed audit record, oldest first
    pub async fn changelog(&self) -> Vec<ChangelogEntry> {
        self.state.read().await.changelog.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn begin(&self) -> Result<Box<dyn NodeTransaction>> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            observed: HashMap::new(),
            writes: Vec::new(),
            changes: Vec::new(),
            closed: false,
        }))
    }
}

/// Transaction over a `MemoryNodeStore`
struct MemoryTransaction {
    state: Arc<RwLock<StoreState>>,
    /// Version seen for each touched document (`None` = did not exist)
    observed: HashMap<String, Option<u64>>,
    writes: Vec<(String, NodePatch)>,
    changes: Vec<ChangelogEntry>,
    closed: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(DatabaseError::TransactionClosed.into());
        }
        Ok(())
    }
}

#[async_trait]
impl NodeTransaction for MemoryTransaction {
    async fn get(&mut self, id: &str) -> Result<Option<Node>> {
        self.ensure_open()?;
        if !self.writes.is_empty() {
            return Err(DatabaseError::read_after_write(id).into());
        }

        let state = self.state.read().await;
        let entry = state.nodes.get(id);
        self.observed
            .entry(id.to_string())
            .or_insert_with(|| entry.map(|e| e.version));
        Ok(entry.map(|e| e.node.clone()))
    }

    async fn update(&mut self, id: &str, patch: NodePatch) -> Result<()> {
        self.ensure_open()?;

        let state = self.state.read().await;
        let version = match state.nodes.get(id) {
            Some(entry) => entry.version,
            None => return Err(DatabaseError::document_not_found(id).into()),
        };
        drop(state);

        self.observed.entry(id.to_string()).or_insert(Some(version));
        self.writes.push((id.to_string(), patch));
        Ok(())
    }

    async fn record_change(&mut self, entry: ChangelogEntry) -> Result<()> {
        self.ensure_open()?;
        self.changes.push(entry);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;

        let mut state = self.state.write().await;

        // Validate every observed version before touching anything
        for (id, seen) in &self.observed {
            let current = state.nodes.get(id).map(|e| e.version);
            if current != *seen {
                tracing::warn!(node_id = %id, "Rejecting commit: document changed since read");
                return Err(DatabaseError::conflict(id.clone()).into());
            }
        }

        // Writes were validated against existing documents, and versions confirm
        // none has disappeared since.
        for (id, patch) in self.writes.drain(..) {
            if let Some(entry) = state.nodes.get_mut(&id) {
                entry.node.apply_patch(patch);
                entry.version += 1;
            }
        }
        state.changelog.append(&mut self.changes);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeType;

    fn flag_patch() -> NodePatch {
        NodePatch {
            pending_inheritance_update: Some(true),
            ..Default::default()
        }
    }

    async fn seeded_store() -> MemoryNodeStore {
        let store = MemoryNodeStore::new();
        store.insert(Node::new("a", "A", "concept")).await;
        store.insert(Node::new("b", "B", "concept")).await;
        store
    }

    #[tokio::test]
    async fn test_commit_applies_writes_and_changelog() {
        let store = seeded_store().await;
        let mut txn = store.begin().await.unwrap();
        let node = txn.get("a").await.unwrap().unwrap();
        txn.update("a", flag_patch()).await.unwrap();
        txn.record_change(ChangelogEntry::new(&node, "alice", ChangeType::AddElement, "r"))
            .await
            .unwrap();

        // Nothing visible before commit
        assert!(!store.get("a").await.unwrap().pending_inheritance_update);
        assert!(store.changelog().await.is_empty());

        txn.commit().await.unwrap();
        assert!(store.get("a").await.unwrap().pending_inheritance_update);
        assert_eq!(store.changelog_for("a").await.len(), 1);
        assert!(store.changelog_for("b").await.is_empty());
    }

    #[tokio::test]
    async fn test_read_after_write_is_rejected() {
        let store = seeded_store().await;
        let mut txn = store.begin().await.unwrap();
        txn.get("a").await.unwrap();
        txn.update("a", flag_patch()).await.unwrap();

        let err = txn.get("b").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatabaseError>(),
            Some(&DatabaseError::read_after_write("b"))
        );
    }

    #[tokio::test]
    async fn test_missing_document_reads_as_none_and_rejects_writes() {
        let store = seeded_store().await;
        let mut txn = store.begin().await.unwrap();
        assert!(txn.get("missing").await.unwrap().is_none());

        let err = txn.update("missing", flag_patch()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatabaseError>(),
            Some(DatabaseError::DocumentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_writer_causes_conflict_and_nothing_applies() {
        let store = seeded_store().await;

        let mut first = store.begin().await.unwrap();
        first.get("a").await.unwrap();
        first.get("b").await.unwrap();

        let mut second = store.begin().await.unwrap();
        second.get("b").await.unwrap();
        second.update("b", flag_patch()).await.unwrap();
        second.commit().await.unwrap();

        first.update("a", flag_patch()).await.unwrap();
        let err = first.commit().await.unwrap_err();
        let db_err = err.downcast_ref::<DatabaseError>().unwrap();
        assert!(db_err.is_retryable());

        // First transaction's write to "a" must not have landed
        assert!(!store.get("a").await.unwrap().pending_inheritance_update);
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = seeded_store().await;
        {
            let mut txn = store.begin().await.unwrap();
            txn.update("a", flag_patch()).await.unwrap();
        }
        assert!(!store.get("a").await.unwrap().pending_inheritance_update);
    }

    #[tokio::test]
    async fn test_commit_twice_is_rejected() {
        let store = seeded_store().await;
        let mut txn = store.begin().await.unwrap();
        txn.commit().await.unwrap();

        let err = txn.commit().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatabaseError>(),
            Some(&DatabaseError::TransactionClosed)
        );
    }
}
