//! Specialization operations
//!
//! Edges seen from the parent side: `node.specializations` holds the children,
//! each child mirrors the parent in its `generalizations.main`.

use chrono::Utc;

use super::edge_mutator;
use super::error::RelationshipError;
use super::relationship_service::{snapshot, traced, RelationshipService};
use crate::models::{find_collection, ChangeType, ChangelogEntry, Node, NodeRef, RelationType};

impl RelationshipService {
    /// Add `nodes` as specializations of `node_id`
    ///
    /// Targets are appended to `collection_name` (default `main`, created if
    /// absent) without duplication, and each target gains `node_id` in its
    /// `generalizations.main`. New children inherit from `node_id` immediately.
    ///
    /// Returns the updated node, or the unchanged node if every target was
    /// already present.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank id or user, an empty/oversized/duplicated node list
    /// - `NotFound` if the parent or a target does not exist
    /// - `Conflict` if the parent or a target is deleted
    /// - `CircularReference` if a target is already an ancestor of `node_id`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nodegraph_core::db::MemoryNodeStore;
    /// use nodegraph_core::models::{Node, NodeRef};
    /// use nodegraph_core::services::RelationshipService;
    /// use std::sync::Arc;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = Arc::new(MemoryNodeStore::new());
    /// store.insert(Node::new("vehicle", "Vehicle", "concept")).await;
    /// store.insert(Node::new("car", "Car", "concept")).await;
    ///
    /// let service = RelationshipService::new(store.clone());
    /// let vehicle = service
    ///     .add_specializations("vehicle", &[NodeRef::new("car")], "alice", "cars are vehicles", None)
    ///     .await?;
    ///
    /// assert_eq!(vehicle.specializations[0].ids(), vec!["car"]);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn add_specializations(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
        collection_name: Option<&str>,
    ) -> Result<Node, RelationshipError> {
        traced(
            "add_specializations",
            node_id,
            self.add_edges(
                RelationType::Specializations,
                node_id,
                nodes,
                user,
                reasoning,
                collection_name,
            )
            .await,
        )
    }

    /// Remove `nodes` from every specialization collection of `node_id`
    ///
    /// Each existing target loses `node_id` from its generalizations. Collections
    /// left empty are kept. Targets that no longer exist are skipped.
    pub async fn remove_specializations(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "remove_specializations",
            node_id,
            self.remove_edges(RelationType::Specializations, node_id, nodes, user, reasoning)
                .await,
        )
    }

    /// Reorder members of one specialization collection
    ///
    /// `new_indices[i]` is the requested position of `nodes[i]`; indices past the
    /// end place the member last. Membership never changes.
    pub async fn reorder_specializations(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        new_indices: &[usize],
        collection_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "reorder_specializations",
            node_id,
            self.reorder_edges(
                RelationType::Specializations,
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

    /// Move `nodes` from one specialization collection of `node_id` to another
    ///
    /// Only the parent document changes: children reference the parent, not the
    /// collection. Nodes already in the target are not duplicated.
    pub async fn move_specializations_between_collections(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        source_collection: &str,
        target_collection: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "move_specializations_between_collections",
            node_id,
            self.move_between_collections(
                node_id,
                nodes,
                source_collection,
                target_collection,
                user,
                reasoning,
            )
            .await,
        )
    }

    async fn move_between_collections(
        &self,
        node_id: &str,
        nodes: &[NodeRef],
        source_collection: &str,
        target_collection: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        let relation = RelationType::Specializations;
        let ids = self.validate_edge_request(
            node_id,
            nodes,
            "No nodes provided to move",
            user,
            reasoning,
        )?;

        let mut ws = self.begin().await?;
        let primary = self
            .load_primary(
                &mut ws,
                node_id,
                || RelationshipError::node_not_found(node_id),
                RelationshipError::cannot_modify_deleted,
            )
            .await?;

        let collections = primary.relation(relation);
        let source_index = find_collection(collections, source_collection).ok_or_else(|| {
            RelationshipError::not_found(format!(
                "Source collection \"{}\" not found",
                source_collection
            ))
        })?;
        if find_collection(collections, target_collection).is_none() {
            return Err(RelationshipError::not_found(format!(
                "Target collection \"{}\" not found",
                target_collection
            )));
        }
        if let Some(missing) = ids
            .iter()
            .find(|id| !collections[source_index].contains(id))
        {
            return Err(RelationshipError::not_found(format!(
                "Node {} not found in source collection",
                missing
            )));
        }

        if source_collection == target_collection {
            tracing::debug!(node_id, collection = source_collection, "Move within the same collection");
            return Ok(primary);
        }

        let node = ws.require_mut(node_id)?;
        edge_mutator::move_between(
            node.relation_mut(relation),
            &ids,
            source_collection,
            target_collection,
        );
        node.add_contributor(user, Some(relation.as_str()));
        node.updated_at = Some(Utc::now());
        node.updated_by = Some(user.to_string());

        let updated = node.clone();
        ws.record(
            ChangelogEntry::new(&updated, user, ChangeType::SortElements, reasoning).with_values(
                relation.as_str(),
                snapshot(&primary.relation(relation))?,
                snapshot(&updated.relation(relation))?,
            ),
        );

        self.finish(ws, Vec::new()).await?;
        tracing::info!(
            node_id,
            from = source_collection,
            to = target_collection,
            count = ids.len(),
            "Specializations moved between collections"
        );
        Ok(updated)
    }
}
