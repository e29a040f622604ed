//! Transactional working set
//!
//! Every engine operation loads the documents it needs through one
//! `NodeTransaction`, mutates in-memory copies, and flushes the differences in
//! a single commit. Loading is only possible until the first write, which is
//! exactly the reads-before-writes discipline the store enforces.

use std::collections::HashMap;

use async_trait::async_trait;

use super::cycle_guard::AncestryReader;
use super::error::{db_error, RelationshipError};
use crate::db::{NodeStore, NodeTransaction};
use crate::models::{ChangelogEntry, Node, NodePatch, RelationType};

pub(crate) struct WorkingSet {
    txn: Box<dyn NodeTransaction>,
    /// Snapshot as read (`None` = document does not exist)
    snapshots: HashMap<String, Option<Node>>,
    /// Mutable copies of existing documents
    current: HashMap<String, Node>,
    /// Load order; flush follows it so writes are deterministic
    order: Vec<String>,
    changes: Vec<ChangelogEntry>,
}

impl WorkingSet {
    pub(crate) async fn begin(store: &dyn NodeStore) -> Result<Self, RelationshipError> {
        let txn = store
            .begin()
            .await
            .map_err(|e| db_error(e, "Failed to begin transaction"))?;
        Ok(Self {
            txn,
            snapshots: HashMap::new(),
            current: HashMap::new(),
            order: Vec::new(),
            changes: Vec::new(),
        })
    }

    /// Read a document through the transaction, once
    pub(crate) async fn load(&mut self, id: &str) -> Result<Option<&Node>, RelationshipError> {
        if !self.snapshots.contains_key(id) {
            let node = self
                .txn
                .get(id)
                .await
                .map_err(|e| db_error(e, &format!("Failed to read node {}", id)))?;
            if let Some(node) = &node {
                self.current.insert(id.to_string(), node.clone());
            }
            self.snapshots.insert(id.to_string(), node);
            self.order.push(id.to_string());
        }
        Ok(self.current.get(id))
    }

    /// Read several documents in order
    pub(crate) async fn load_all<'a, I>(&mut self, ids: I) -> Result<(), RelationshipError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in ids {
            self.load(id).await?;
        }
        Ok(())
    }

    /// Load every node linked from `id` through `relation`
    pub(crate) async fn load_linked(
        &mut self,
        id: &str,
        relation: RelationType,
    ) -> Result<Vec<String>, RelationshipError> {
        let linked: Vec<String> = match self.get(id) {
            Some(node) => node
                .linked_ids(relation)
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        self.load_all(linked.iter().map(String::as_str)).await?;
        Ok(linked)
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Node> {
        self.current.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.current.get_mut(id)
    }

    pub(crate) fn require_mut(&mut self, id: &str) -> Result<&mut Node, RelationshipError> {
        self.current
            .get_mut(id)
            .ok_or_else(|| RelationshipError::node_not_found(id))
    }

    /// Stage an audit record for the commit
    pub(crate) fn record(&mut self, entry: ChangelogEntry) {
        self.changes.push(entry);
    }

    /// Ids whose in-memory copy differs from the snapshot
    pub(crate) fn dirty_ids(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| match (self.snapshots.get(*id), self.current.get(*id)) {
                (Some(Some(before)), Some(after)) => before != after,
                _ => false,
            })
            .cloned()
            .collect()
    }

    /// Write every changed document and the staged audit records, then commit
    ///
    /// Returns the ids of the written nodes in load order.
    pub(crate) async fn commit(mut self) -> Result<Vec<String>, RelationshipError> {
        let dirty = self.dirty_ids();

        for id in &dirty {
            if let (Some(Some(before)), Some(after)) = (self.snapshots.get(id), self.current.get(id))
            {
                let patch = NodePatch::diff(before, after);
                if patch.is_empty() {
                    continue;
                }
                self.txn
                    .update(id, patch)
                    .await
                    .map_err(|e| db_error(e, &format!("Failed to update node {}", id)))?;
            }
        }

        for entry in self.changes.drain(..) {
            self.txn
                .record_change(entry)
                .await
                .map_err(|e| db_error(e, "Failed to record change"))?;
        }

        self.txn.commit().await.map_err(|e| {
            let err = db_error(e, "Failed to commit transaction");
            if err.is_retryable() {
                tracing::warn!(error = %err, "Relationship transaction lost a write conflict");
            }
            err
        })?;

        Ok(dirty)
    }
}

#[async_trait]
impl AncestryReader for WorkingSet {
    async fn generalizations_of(
        &mut self,
        id: &str,
    ) -> Result<Option<Vec<String>>, RelationshipError> {
        Ok(self.load(id).await?.map(|node| {
            node.linked_ids(RelationType::Generalizations)
                .into_iter()
                .map(str::to_string)
                .collect()
        }))
    }
}
