//! Relationship Service
//!
//! `RelationshipService` is the public surface of the relationship engine. It
//! mutates the generalization/specialization graph transactionally, keeping
//! both halves of every edge consistent, rejecting cycles, managing named
//! collections and propagating inherited properties.
//!
//! # Operation Shape
//!
//! Every operation follows the same steps:
//!
//! 1. Validate inputs (no store access)
//! 2. Open one transaction and load every document it needs
//! 3. Mutate in-memory copies
//! 4. Flush changed documents and audit records in one commit
//! 5. Publish domain events
//!
//! A failure at any step before the commit leaves the store untouched.
//!
//! The operations themselves live in sibling modules, grouped by area:
//! `collections`, `specializations`, `generalizations` and `transfer`.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::error::RelationshipError;
use super::working_set::WorkingSet;
use crate::config::RelationshipConfig;
use crate::db::{DomainEvent, InheritanceTrigger, InheritanceWorkItem, NodeStore};
use crate::models::{Node, NodeRef, RelationType};

/// Relationship and inheritance engine over a transactional node store
///
/// Cloning is cheap; clones share the store and the event channel.
#[derive(Clone)]
pub struct RelationshipService {
    store: Arc<dyn NodeStore>,

    config: Arc<RelationshipConfig>,

    /// Broadcast channel for domain events
    event_tx: broadcast::Sender<DomainEvent>,

    /// Optional client identifier for event source tracking
    ///
    /// When set, all emitted events carry this id as `source_client_id`, so a
    /// client can ignore the echoes of its own changes.
    client_id: Option<String>,
}

impl RelationshipService {
    /// Create a service with the default configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nodegraph_core::db::MemoryNodeStore;
    /// use nodegraph_core::services::RelationshipService;
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(MemoryNodeStore::new());
    /// let service = RelationshipService::new(store);
    /// assert_eq!(service.config().max_nodes_per_operation, 100);
    /// ```
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self::build(store, RelationshipConfig::default())
    }

    /// Create a service with an explicit configuration
    ///
    /// # Errors
    ///
    /// `RelationshipError::InvalidInput` if the configuration does not validate.
    pub fn with_config(
        store: Arc<dyn NodeStore>,
        config: RelationshipConfig,
    ) -> Result<Self, RelationshipError> {
        config.validate().map_err(RelationshipError::invalid_input)?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<dyn NodeStore>, config: RelationshipConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            store,
            config: Arc::new(config),
            event_tx,
            client_id: None,
        }
    }

    pub fn config(&self) -> &RelationshipConfig {
        &self.config
    }

    /// Create a new service handle tagged with a client identifier
    ///
    /// All operations performed through the returned handle emit events with
    /// `client_id` as their `source_client_id`.
    pub fn with_client(&self, client_id: impl Into<String>) -> Self {
        let mut cloned = self.clone();
        cloned.client_id = Some(client_id.into());
        cloned
    }

    /// Subscribe to domain events
    ///
    /// The receiver sees `NodeUpdated` for every written node and
    /// `InheritanceUpdateQueued` for deferred inheritance work, after commit.
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Emit a domain event to all subscribers
    ///
    /// Ignores errors if there are no subscribers.
    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    //
    // TRANSACTION HELPERS
    //

    pub(super) async fn begin(&self) -> Result<WorkingSet, RelationshipError> {
        WorkingSet::begin(self.store.as_ref()).await
    }

    /// Commit the working set and publish events for what was written
    pub(super) async fn finish(
        &self,
        ws: WorkingSet,
        queued: Vec<InheritanceWorkItem>,
    ) -> Result<Vec<String>, RelationshipError> {
        let written = ws.commit().await?;

        for id in &written {
            self.emit_event(DomainEvent::NodeUpdated {
                id: id.clone(),
                source_client_id: self.client_id.clone(),
            });
        }
        for item in queued {
            self.emit_event(DomainEvent::InheritanceUpdateQueued {
                item,
                source_client_id: self.client_id.clone(),
            });
        }

        Ok(written)
    }

    /// Load the primary node of an operation and reject tombstones
    pub(super) async fn load_primary(
        &self,
        ws: &mut WorkingSet,
        node_id: &str,
        missing: impl FnOnce() -> RelationshipError,
        deleted: impl FnOnce() -> RelationshipError,
    ) -> Result<Node, RelationshipError> {
        let node = ws.load(node_id).await?.cloned().ok_or_else(missing)?;
        if node.deleted {
            let err = deleted();
            tracing::debug!(node_id, error = %err, "Rejected change to deleted node");
            return Err(err);
        }
        Ok(node)
    }

    /// Flag the direct specializations of `ancestor_id` for deferred inheritance
    /// recomputation
    ///
    /// Loads them through the working set; missing and deleted nodes are skipped.
    pub(super) async fn queue_descendants(
        &self,
        ws: &mut WorkingSet,
        ancestor_id: &str,
    ) -> Result<Vec<InheritanceWorkItem>, RelationshipError> {
        let children = ws
            .load_linked(ancestor_id, RelationType::Specializations)
            .await?;

        let mut queued = Vec::new();
        let mut seen = HashSet::new();
        for child_id in children {
            if !seen.insert(child_id.clone()) {
                continue;
            }
            if let Some(child) = ws.get_mut(&child_id) {
                if child.deleted {
                    continue;
                }
                child.pending_inheritance_update = true;
                queued.push(InheritanceWorkItem {
                    node_id: child_id,
                    trigger: InheritanceTrigger::AncestorChanged {
                        ancestor_id: ancestor_id.to_string(),
                    },
                });
            }
        }
        Ok(queued)
    }

    //
    // VALIDATION HELPERS
    //

    pub(super) fn validate_node_id(&self, node_id: &str) -> Result<(), RelationshipError> {
        if node_id.trim().is_empty() {
            return Err(RelationshipError::invalid_node_id());
        }
        Ok(())
    }

    pub(super) fn validate_user(&self, user: &str) -> Result<(), RelationshipError> {
        if user.trim().is_empty() {
            return Err(RelationshipError::username_required());
        }
        Ok(())
    }

    pub(super) fn validate_reasoning(&self, reasoning: &str) -> Result<(), RelationshipError> {
        let max = self.config.max_reasoning_length;
        if reasoning.chars().count() > max {
            return Err(RelationshipError::invalid_input(format!(
                "Reasoning must not exceed {} characters",
                max
            )));
        }
        Ok(())
    }

    pub(super) fn validate_collection_name_length(
        &self,
        name: &str,
    ) -> Result<(), RelationshipError> {
        let max = self.config.max_collection_name_length;
        if name.chars().count() > max {
            return Err(RelationshipError::invalid_input(format!(
                "Collection name must not exceed {} characters",
                max
            )));
        }
        Ok(())
    }

    /// Validate a list of node references and return their ids in order
    ///
    /// Rejects an empty list (with `empty_message`), lists over the configured
    /// size, blank ids and duplicates.
    pub(super) fn validate_node_refs(
        &self,
        nodes: &[NodeRef],
        empty_message: &str,
    ) -> Result<Vec<String>, RelationshipError> {
        if nodes.is_empty() {
            return Err(RelationshipError::invalid_input(empty_message));
        }

        let max = self.config.max_nodes_per_operation;
        if nodes.len() > max {
            return Err(RelationshipError::invalid_input(format!(
                "Maximum of {} nodes can be processed at once",
                max
            )));
        }

        let mut seen = HashSet::with_capacity(nodes.len());
        let mut ids = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if node.id.trim().is_empty() {
                return Err(RelationshipError::invalid_input(format!(
                    "Invalid or missing node ID at index {}",
                    index
                )));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(RelationshipError::invalid_input(format!(
                    "Duplicate node ID found: {}",
                    node.id
                )));
            }
            ids.push(node.id.clone());
        }
        Ok(ids)
    }

    /// Common checks shared by every edge operation
    pub(super) fn validate_edge_request(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        empty_message: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Vec<String>, RelationshipError> {
        self.validate_node_id(node_id)?;
        let ids = self.validate_node_refs(nodes, empty_message)?;
        self.validate_user(user)?;
        self.validate_reasoning(reasoning)?;
        Ok(ids)
    }
}

/// JSON snapshot of a value for audit records
pub(super) fn snapshot<T: Serialize>(value: &T) -> Result<Value, RelationshipError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::warn!(error = %e, "Failed to snapshot audit values");
        RelationshipError::serialization_error(e.to_string())
    })
}

/// Log a rejected operation at debug level and pass the result through
pub(super) fn traced<T>(
    operation: &str,
    node_id: &str,
    result: Result<T, RelationshipError>,
) -> Result<T, RelationshipError> {
    if let Err(err) = &result {
        tracing::debug!(operation, node_id, error = %err, "Relationship operation rejected");
    }
    result
}

/// Message used when an edge request carries no nodes
pub(super) fn no_nodes_message(relation: RelationType) -> String {
    format!("No {} nodes provided", relation.singular())
}
