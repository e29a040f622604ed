//! Specialization transfer
//!
//! Moves specializations from one parent to another in a single transaction:
//! the source, the target and every moved child are written together. The
//! moved children are not recomputed here; they are flagged
//! `pendingInheritanceUpdate` and announced as deferred inheritance work.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::cycle_guard::would_create_cycle;
use super::edge_mutator;
use super::error::RelationshipError;
use super::relationship_service::{snapshot, traced, RelationshipService};
use crate::db::{InheritanceTrigger, InheritanceWorkItem};
use crate::models::{
    canonical_collection_name, contains_anywhere, ensure_main, ChangeType, ChangelogEntry, Node,
    NodeRef, RelationType, MAIN_COLLECTION,
};

/// Both parents after a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub updated_source_node: Node,
    pub updated_target_node: Node,
}

const COLLECTION_NAME_PATTERN: &str = r"^[a-zA-Z0-9_-]+$";

fn collection_name_pattern() -> Result<&'static Regex, RelationshipError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(COLLECTION_NAME_PATTERN))
        .as_ref()
        .map_err(|e| {
            RelationshipError::initialization_error(format!(
                "Collection name pattern failed to compile: {}",
                e
            ))
        })
}

impl RelationshipService {
    /// Move `nodes` from the specializations of `source_id` to those of `target_id`
    ///
    /// Moved nodes leave every collection of the source, are appended to
    /// `target_collection` (default `main`, created if absent) and have the
    /// source replaced by the target in their `generalizations.main`.
    ///
    /// # Errors
    ///
    /// - "Source and target nodes cannot be the same"
    /// - "Collection name can only contain letters, numbers, hyphens, and underscores"
    /// - `NotFound` / `Conflict` when either parent or a moved node is missing or deleted
    /// - "Node X not found in source node's specializations"
    /// - "Adding node X as a specialization of T would create a circular reference"
    pub async fn transfer_specializations(
        &self,
        source_id: &str,
        target_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
        target_collection: Option<&str>,
    ) -> Result<TransferResult, RelationshipError> {
        traced(
            "transfer_specializations",
            source_id,
            self.transfer_inner(source_id, target_id, nodes, user, reasoning, target_collection)
                .await,
        )
    }

    async fn transfer_inner(
        &self,
        source_id: &str,
        target_id: &str,
        nodes: &[NodeRef],
        user: &str,
        reasoning: &str,
        target_collection: Option<&str>,
    ) -> Result<TransferResult, RelationshipError> {
        let relation = RelationType::Specializations;

        if source_id.trim().is_empty() {
            return Err(RelationshipError::invalid_input("Invalid source node ID"));
        }
        if target_id.trim().is_empty() {
            return Err(RelationshipError::invalid_input("Invalid target node ID"));
        }
        if source_id == target_id {
            return Err(RelationshipError::conflict(
                "Source and target nodes cannot be the same",
            ));
        }
        let ids = self.validate_node_refs(nodes, "No nodes provided for transfer")?;
        self.validate_user(user)?;
        self.validate_reasoning(reasoning)?;

        let target_collection = target_collection.unwrap_or(MAIN_COLLECTION);
        if !collection_name_pattern()?.is_match(target_collection) {
            return Err(RelationshipError::invalid_input(
                "Collection name can only contain letters, numbers, hyphens, and underscores",
            ));
        }
        self.validate_collection_name_length(target_collection)?;
        let target_collection = canonical_collection_name(target_collection);

        tracing::debug!(
            source_id,
            target_id,
            count = ids.len(),
            collection = target_collection,
            "Transferring specializations"
        );

        let mut ws = self.begin().await?;
        let source = self
            .load_primary(
                &mut ws,
                source_id,
                || RelationshipError::not_found(format!("Source node {} not found", source_id)),
                || {
                    RelationshipError::conflict(format!(
                        "Source node {} is deleted and cannot be modified",
                        source_id
                    ))
                },
            )
            .await?;
        let target = self
            .load_primary(
                &mut ws,
                target_id,
                || RelationshipError::not_found(format!("Target node {} not found", target_id)),
                || {
                    RelationshipError::conflict(format!(
                        "Target node {} is deleted and cannot be modified",
                        target_id
                    ))
                },
            )
            .await?;

        for id in &ids {
            if !contains_anywhere(source.relation(relation), id) {
                return Err(RelationshipError::not_found(format!(
                    "Node {} not found in source node's specializations",
                    id
                )));
            }
            match ws.load(id).await? {
                None => return Err(RelationshipError::related_node_not_found(relation, id)),
                Some(node) if node.deleted => {
                    return Err(RelationshipError::conflict(format!(
                        "Specialization node {} is deleted and cannot be transferred",
                        id
                    )))
                }
                Some(_) => {}
            }
        }

        for id in &ids {
            if would_create_cycle(&mut ws, target_id, id, self.config().max_traversal_nodes).await?
            {
                return Err(RelationshipError::circular_reference(format!(
                    "Adding node {} as a specialization of {} would create a circular reference",
                    id, target_id
                )));
            }
        }

        let source_node = ws.require_mut(source_id)?;
        for id in &ids {
            edge_mutator::remove_everywhere(source_node.relation_mut(relation), id);
        }
        ensure_main(source_node.relation_mut(relation));
        source_node.add_contributor(user, Some(relation.as_str()));
        let updated_source = source_node.clone();

        let target_node = ws.require_mut(target_id)?;
        edge_mutator::append_unique(target_node.relation_mut(relation), target_collection, &ids);
        target_node.add_contributor(user, Some(relation.as_str()));
        let updated_target = target_node.clone();

        let mut queued = Vec::with_capacity(ids.len());
        for id in &ids {
            let moved = ws.require_mut(id)?;
            edge_mutator::retarget(
                moved.relation_mut(RelationType::Generalizations),
                source_id,
                target_id,
            );
            moved.pending_inheritance_update = true;
            queued.push(InheritanceWorkItem {
                node_id: id.clone(),
                trigger: InheritanceTrigger::SpecializationTransferred {
                    from: source_id.to_string(),
                    to: target_id.to_string(),
                },
            });
        }

        ws.record(
            ChangelogEntry::new(&updated_source, user, ChangeType::RemoveElement, reasoning)
                .with_values(
                    relation.as_str(),
                    snapshot(&source.relation(relation))?,
                    snapshot(&updated_source.relation(relation))?,
                ),
        );
        ws.record(
            ChangelogEntry::new(&updated_target, user, ChangeType::AddElement, reasoning)
                .with_values(
                    relation.as_str(),
                    snapshot(&target.relation(relation))?,
                    snapshot(&updated_target.relation(relation))?,
                ),
        );

        let written = self.finish(ws, queued).await?;
        tracing::info!(
            source_id,
            target_id,
            moved = ids.len(),
            written = written.len(),
            "Specializations transferred"
        );

        Ok(TransferResult {
            updated_source_node: updated_source,
            updated_target_node: updated_target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_pattern() {
        let pattern = collection_name_pattern().unwrap();
        assert!(pattern.is_match("main"));
        assert!(pattern.is_match("sub_types-2"));
        assert!(!pattern.is_match("has space"));
        assert!(!pattern.is_match("dots.not.allowed"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn test_transfer_result_serializes_camel_case() {
        let result = TransferResult {
            updated_source_node: Node::new("s", "S", "concept"),
            updated_target_node: Node::new("t", "T", "concept"),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["updatedSourceNode"]["id"], "s");
        assert_eq!(json["updatedTargetNode"]["id"], "t");
    }
}
