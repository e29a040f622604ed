//! Edge operations shared by both relationship directions
//!
//! Adding, removing and reordering work the same way for specializations and
//! generalizations; only the direction of the mirrored half, the cycle check
//! orientation and a few messages differ.

use super::cycle_guard::would_create_cycle;
use super::edge_mutator;
use super::error::RelationshipError;
use super::inheritance;
use super::relationship_service::{no_nodes_message, snapshot, RelationshipService};
use super::working_set::WorkingSet;
use crate::db::InheritanceWorkItem;
use crate::models::{
    canonical_collection_name, ensure_main, find_collection, ChangeType, ChangelogEntry, Node,
    NodeRef, RelationType, MAIN_COLLECTION,
};

/// (child id, ancestor id) pairs whose generalization link changed
type Links = Vec<(String, String)>;

fn link(relation: RelationType, node_id: &str, other_id: &str) -> (String, String) {
    match relation {
        RelationType::Generalizations => (node_id.to_string(), other_id.to_string()),
        RelationType::Specializations => (other_id.to_string(), node_id.to_string()),
    }
}

impl RelationshipService {
    /// Add edges from `node_id` to every node in `nodes` along `relation`
    pub(super) async fn add_edges(
        &self,
        relation: RelationType,
        node_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
        collection_name: Option<&str>,
    ) -> Result<Node, RelationshipError> {
        let ids =
            self.validate_edge_request(node_id, nodes, &no_nodes_message(relation), user, reasoning)?;
        let collection_name = collection_name.unwrap_or(MAIN_COLLECTION);
        if collection_name.trim().is_empty() {
            return Err(RelationshipError::invalid_input("Collection name is required"));
        }
        self.validate_collection_name_length(collection_name)?;
        let collection_name = canonical_collection_name(collection_name);

        tracing::debug!(
            node_id,
            relation = %relation,
            count = ids.len(),
            collection = collection_name,
            "Adding edges"
        );

        let mut ws = self.begin().await?;
        let primary = self
            .load_primary(
                &mut ws,
                node_id,
                || {
                    let role = match relation {
                        RelationType::Specializations => "Parent",
                        RelationType::Generalizations => "Child",
                    };
                    RelationshipError::not_found(format!("{} node {} not found", role, node_id))
                },
                || RelationshipError::deleted_node(node_id),
            )
            .await?;

        for id in &ids {
            match ws.load(id).await? {
                None => return Err(RelationshipError::related_node_not_found(relation, id)),
                Some(target) if target.deleted => {
                    return Err(RelationshipError::related_node_deleted(relation, id))
                }
                Some(_) => {}
            }
        }

        for id in &ids {
            let (child, ancestor) = link(relation, node_id, id);
            if would_create_cycle(&mut ws, &ancestor, &child, self.config().max_traversal_nodes)
                .await?
            {
                return Err(RelationshipError::circular_reference(format!(
                    "Adding node {} as a {} would create a circular reference",
                    id,
                    relation.singular()
                )));
            }
        }

        let before = primary.relation(relation).to_vec();
        let node = ws.require_mut(node_id)?;
        let added = edge_mutator::append_unique(node.relation_mut(relation), collection_name, &ids);
        if added.is_empty() {
            tracing::debug!(node_id, relation = %relation, "All edges already present");
            return Ok(primary);
        }
        node.add_contributor(user, Some(relation.as_str()));

        let mut links: Links = Vec::with_capacity(added.len());
        for id in &added {
            if let Some(target) = ws.get_mut(id) {
                edge_mutator::mirror_into_main(target.relation_mut(relation.inverse()), node_id);
            }
            links.push(link(relation, node_id, id));
        }

        let queued = self.propagate_added(&mut ws, &links).await?;

        let updated = ws.require_mut(node_id)?.clone();
        ws.record(
            ChangelogEntry::new(&updated, user, ChangeType::AddElement, reasoning).with_values(
                relation.as_str(),
                snapshot(&before)?,
                snapshot(&updated.relation(relation))?,
            ),
        );

        let written = self.finish(ws, queued).await?;
        tracing::info!(
            node_id,
            relation = %relation,
            added = added.len(),
            written = written.len(),
            "Edges added"
        );
        Ok(updated)
    }

    /// Remove the edges between `node_id` and every node in `nodes` along `relation`
    pub(super) async fn remove_edges(
        &self,
        relation: RelationType,
        node_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        let ids =
            self.validate_edge_request(node_id, nodes, &no_nodes_message(relation), user, reasoning)?;

        tracing::debug!(node_id, relation = %relation, count = ids.len(), "Removing edges");

        let mut ws = self.begin().await?;
        let primary = self
            .load_primary(
                &mut ws,
                node_id,
                || RelationshipError::node_not_found(node_id),
                || RelationshipError::deleted_node(node_id),
            )
            .await?;

        if relation == RelationType::Generalizations {
            let remaining = primary
                .linked_ids(RelationType::Generalizations)
                .into_iter()
                .filter(|id| !ids.iter().any(|removed| removed.as_str() == *id))
                .count();
            if remaining == 0 {
                return Err(RelationshipError::conflict(
                    "Cannot remove all generalizations from a node. Every node must have at least one generalization. \
                     Please add a new generalization before removing the existing one.",
                ));
            }
        }

        // Targets that no longer exist only lose their half on the primary side
        ws.load_all(ids.iter().map(String::as_str)).await?;

        let before = primary.relation(relation).to_vec();
        let node = ws.require_mut(node_id)?;
        let mut removed = Vec::new();
        for id in &ids {
            if edge_mutator::remove_everywhere(node.relation_mut(relation), id) {
                removed.push(id.clone());
            }
        }
        ensure_main(node.relation_mut(relation));

        let mut mirrored = Vec::new();
        for id in &ids {
            let Some(target) = ws.get_mut(id) else {
                continue;
            };
            if target.deleted {
                continue;
            }
            let mirror = target.relation_mut(relation.inverse());
            if edge_mutator::remove_everywhere(mirror, node_id) {
                ensure_main(mirror);
                mirrored.push(id.clone());
            }
        }

        if removed.is_empty() && mirrored.is_empty() {
            tracing::debug!(node_id, relation = %relation, "No edges to remove");
            return Ok(primary);
        }

        ws.require_mut(node_id)?
            .add_contributor(user, Some(relation.as_str()));

        let links: Links = match relation {
            RelationType::Generalizations => removed
                .iter()
                .map(|id| link(relation, node_id, id))
                .collect(),
            RelationType::Specializations => mirrored
                .iter()
                .map(|id| link(relation, node_id, id))
                .collect(),
        };
        let queued = self.propagate_removed(&mut ws, &links).await?;

        let updated = ws.require_mut(node_id)?.clone();
        ws.record(
            ChangelogEntry::new(&updated, user, ChangeType::RemoveElement, reasoning).with_values(
                relation.as_str(),
                snapshot(&before)?,
                snapshot(&updated.relation(relation))?,
            ),
        );

        let written = self.finish(ws, queued).await?;
        tracing::info!(
            node_id,
            relation = %relation,
            removed = removed.len(),
            written = written.len(),
            "Edges removed"
        );
        Ok(updated)
    }

    /// Reposition members of one collection of `relation`
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn reorder_edges(
        &self,
        relation: RelationType,
        node_id: &str,
        nodes: &[NodeRef],
        new_indices: &[usize],
        collection_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        self.validate_node_id(node_id)?;
        let ids = self.validate_node_refs(nodes, "No nodes provided for reordering")?;
        if new_indices.len() != ids.len() {
            return Err(RelationshipError::invalid_input(
                "New indices array must match nodes array length",
            ));
        }
        self.validate_user(user)?;
        self.validate_reasoning(reasoning)?;

        let mut ws = self.begin().await?;
        let primary = self
            .load_primary(
                &mut ws,
                node_id,
                || RelationshipError::node_not_found(node_id),
                RelationshipError::cannot_modify_deleted,
            )
            .await?;

        let collection_index = find_collection(primary.relation(relation), collection_name)
            .ok_or_else(|| {
                RelationshipError::not_found(format!(
                    "Collection '{}' not found in node's {}",
                    collection_name, relation
                ))
            })?;
        let collection = &primary.relation(relation)[collection_index];
        if let Some(missing) = ids.iter().find(|id| !collection.contains(id)) {
            return Err(RelationshipError::not_found(format!(
                "Node {} not found in collection {}",
                missing, collection_name
            )));
        }

        let moves: Vec<(String, usize)> = ids.into_iter().zip(new_indices.iter().copied()).collect();
        let node = ws.require_mut(node_id)?;
        let details = edge_mutator::reorder(
            &mut node.relation_mut(relation)[collection_index],
            collection_index,
            &moves,
        );
        if details.is_none() {
            tracing::debug!(node_id, collection = collection_name, "Order unchanged");
            return Ok(primary);
        }
        node.add_contributor(user, Some(relation.as_str()));

        let updated = node.clone();
        ws.record(
            ChangelogEntry::new(&updated, user, ChangeType::SortElements, reasoning)
                .with_values(
                    relation.as_str(),
                    snapshot(&primary.relation(relation))?,
                    snapshot(&updated.relation(relation))?,
                )
                .with_details(details),
        );

        self.finish(ws, Vec::new()).await?;
        tracing::info!(node_id, relation = %relation, collection = collection_name, "Collection reordered");
        Ok(updated)
    }

    /// Pull properties from newly linked ancestors and queue the descendants
    /// of every child whose inherited properties changed
    pub(super) async fn propagate_added(
        &self,
        ws: &mut WorkingSet,
        links: &[(String, String)],
    ) -> Result<Vec<InheritanceWorkItem>, RelationshipError> {
        let mut changed: Vec<String> = Vec::new();
        for (child_id, ancestor_id) in links {
            let Some(ancestor) = ws.get(ancestor_id).cloned() else {
                continue;
            };
            let Some(child) = ws.get_mut(child_id) else {
                continue;
            };
            if inheritance::apply_added_generalization(child, &ancestor)
                && !changed.contains(child_id)
            {
                changed.push(child_id.clone());
            }
        }
        self.queue_all(ws, &changed).await
    }

    /// Re-source properties inherited through removed links and queue the
    /// descendants of every child whose inherited properties changed
    pub(super) async fn propagate_removed(
        &self,
        ws: &mut WorkingSet,
        links: &[(String, String)],
    ) -> Result<Vec<InheritanceWorkItem>, RelationshipError> {
        let mut changed: Vec<String> = Vec::new();
        for (child_id, removed_id) in links {
            let remaining_ids = ws
                .load_linked(child_id, RelationType::Generalizations)
                .await?;
            let remaining: Vec<Node> = remaining_ids
                .iter()
                .filter_map(|id| ws.get(id).cloned())
                .collect();
            let remaining: Vec<&Node> = remaining.iter().collect();

            let Some(child) = ws.get_mut(child_id) else {
                continue;
            };
            if child.deleted {
                continue;
            }
            if inheritance::apply_removed_generalization(child, removed_id, &remaining)
                && !changed.contains(child_id)
            {
                changed.push(child_id.clone());
            }
        }
        self.queue_all(ws, &changed).await
    }

    async fn queue_all(
        &self,
        ws: &mut WorkingSet,
        changed: &[String],
    ) -> Result<Vec<InheritanceWorkItem>, RelationshipError> {
        let mut queued = Vec::new();
        for child_id in changed {
            for item in self.queue_descendants(ws, child_id).await? {
                if !queued.contains(&item) {
                    queued.push(item);
                }
            }
        }
        Ok(queued)
    }
}
