//! Generalization operations
//!
//! Edges seen from the child side. Unlike specializations, changing a node's
//! generalizations changes what it inherits, so both add and remove run the
//! inheritance propagator on the node before committing, and flag the node's
//! own specializations for deferred recomputation when its properties moved.

use super::error::RelationshipError;
use super::relationship_service::{traced, RelationshipService};
use crate::models::{Node, NodeRef, RelationType};

impl RelationshipService {
    /// Add `nodes` as generalizations of `node_id`
    ///
    /// Each target is appended to `collection_name` (default `main`) and gains
    /// `node_id` in its `specializations.main`. Properties of the new ancestors
    /// are inherited immediately:
    ///
    /// - `alwaysInherit` values overwrite the node's value
    /// - `inheritUnlessAlreadyOverRidden` values fill in missing properties only
    /// - `neverInherit` values are never copied
    ///
    /// # Errors
    ///
    /// Besides the usual input errors, fails with
    /// "Adding node {id} as a generalization would create a circular reference"
    /// when a target is `node_id` itself or one of its descendants. Nothing is
    /// written in that case.
    pub async fn add_generalizations(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
        collection_name: Option<&str>,
    ) -> Result<Node, RelationshipError> {
        traced(
            "add_generalizations",
            node_id,
            self.add_edges(
                RelationType::Generalizations,
                node_id,
                nodes,
                user,
                reasoning,
                collection_name,
            )
            .await,
        )
    }

    /// Remove `nodes` from every generalization collection of `node_id`
    ///
    /// Rejected if no generalization would remain. Properties the node inherited
    /// from a removed ancestor are re-sourced from the first remaining ancestor
    /// that owns them, or dropped.
    pub async fn remove_generalizations(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "remove_generalizations",
            node_id,
            self.remove_edges(RelationType::Generalizations, node_id, nodes, user, reasoning)
                .await,
        )
    }

    /// Reorder members of one generalization collection
    ///
    /// Order matters: it decides which ancestor re-sources a property when
    /// another ancestor is removed.
    pub async fn reorder_generalizations(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        new_indices: &[usize],
        collection_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "reorder_generalizations",
            node_id,
            self.reorder_edges(
                RelationType::Generalizations,
                node_id,
                nodes,
                new_indices,
                collection_name,
                user,
                reasoning,
            )
            .await,
        )
    }
}
