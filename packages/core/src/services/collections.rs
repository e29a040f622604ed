//! Collection Manager
//!
//! Creates, renames and deletes the named collections inside a node's
//! relationship arrays. The reserved `main` collection can never be created,
//! renamed or deleted through these operations; it is restored whenever an
//! array is written without it.
//!
//! Collection changes touch only the owning node: edge mirrors reference the
//! node, not the collection.

use std::collections::HashSet;

use super::error::RelationshipError;
use super::relationship_service::{snapshot, traced, RelationshipService};
use super::working_set::WorkingSet;
use crate::models::{
    ensure_main, find_collection, is_reserved_collection, ChangeType, ChangelogEntry, Collection,
    Node, RelationType,
};

const RESERVED_CREATE_MESSAGE: &str = "Cannot create a collection named \"main\" as it is reserved";

impl RelationshipService {
    /// Append an empty collection named `collection_name` to `relation`
    ///
    /// A relationship array that has never been touched is initialized with
    /// `main` first.
    ///
    /// # Errors
    ///
    /// - "Collection name is required" for a blank name
    /// - "Cannot create a collection named \"main\" as it is reserved" (any casing)
    /// - "Collection \"X\" already exists in {relationType}"
    pub async fn create_collection(
        &self,
        node_id: &str,
        relation: RelationType,
        collection_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "create_collection",
            node_id,
            self.create_collections_inner(
                node_id,
                relation,
                &[collection_name],
                user,
                reasoning,
                false,
            )
            .await,
        )
    }

    /// Append several empty collections to `relation` at once
    ///
    /// The batch fails as a whole if any name is blank, reserved, repeated within
    /// the request, or already present; every already-present name is reported
    /// in one message.
    pub async fn create_multiple_collections<S: AsRef<str>>(
        &self,
        node_id: &str,
        relation: RelationType,
        collection_names: &[S],
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        let names: Vec<&str> = collection_names.iter().map(AsRef::as_ref).collect();
        traced(
            "create_multiple_collections",
            node_id,
            self.create_collections_inner(node_id, relation, &names, user, reasoning, true)
                .await,
        )
    }

    async fn create_collections_inner(
        &self,
        node_id: &str,
        relation: RelationType,
        names: &[&str],
        user: &str,
        reasoning: &str,
        batch: bool,
    ) -> Result<Node, RelationshipError> {
        self.validate_node_id(node_id)?;
        if names.is_empty() {
            return Err(RelationshipError::invalid_input(
                "At least one collection name is required",
            ));
        }

        let mut seen = HashSet::new();
        for name in names {
            if name.trim().is_empty() {
                return Err(RelationshipError::invalid_input(if batch {
                    "Collection names cannot be empty"
                } else {
                    "Collection name is required"
                }));
            }
            if is_reserved_collection(name) {
                return Err(RelationshipError::conflict(RESERVED_CREATE_MESSAGE));
            }
            self.validate_collection_name_length(name)?;
            if !seen.insert(*name) {
                return Err(RelationshipError::invalid_input(format!(
                    "Duplicate collection name in request: {}",
                    name
                )));
            }
        }
        self.validate_user(user)?;
        self.validate_reasoning(reasoning)?;

        let (mut ws, primary) = self.load_for_collection_change(node_id).await?;

        let existing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| find_collection(primary.relation(relation), name).is_some())
            .collect();
        if !existing.is_empty() {
            return Err(RelationshipError::conflict(if batch {
                format!(
                    "The following collections already exist: {}",
                    existing.join(", ")
                )
            } else {
                format!(
                    "Collection \"{}\" already exists in {}",
                    existing[0], relation
                )
            }));
        }

        let node = ws.require_mut(node_id)?;
        let collections = node.relation_mut(relation);
        ensure_main(collections);
        collections.extend(names.iter().map(|name| Collection::new(*name)));
        node.add_contributor(user, None);

        let updated = node.clone();
        self.commit_collection_change(
            ws,
            &primary,
            &updated,
            relation,
            user,
            reasoning,
            ChangeType::AddCollection,
        )
        .await?;
        tracing::info!(node_id, relation = %relation, created = ?names, "Collections created");
        Ok(updated)
    }

    /// Delete an empty, non-reserved collection from `relation`
    ///
    /// # Errors
    ///
    /// - "Cannot delete the \"main\" collection as it is required"
    /// - "Node does not have any {relationType} collections"
    /// - "Collection \"X\" not found in {relationType}"
    /// - "Cannot delete collection \"X\" because it contains N nodes. ..."
    pub async fn delete_collection(
        &self,
        node_id: &str,
        relation: RelationType,
        collection_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "delete_collection",
            node_id,
            self.delete_collection_inner(node_id, relation, collection_name, user, reasoning)
                .await,
        )
    }

    async fn delete_collection_inner(
        &self,
        node_id: &str,
        relation: RelationType,
        collection_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        self.validate_node_id(node_id)?;
        if collection_name.trim().is_empty() {
            return Err(RelationshipError::invalid_input("Collection name is required"));
        }
        if is_reserved_collection(collection_name) {
            return Err(RelationshipError::conflict(
                "Cannot delete the \"main\" collection as it is required",
            ));
        }
        self.validate_user(user)?;
        self.validate_reasoning(reasoning)?;

        let (mut ws, primary) = self.load_for_collection_change(node_id).await?;

        let collections = primary.relation(relation);
        if collections.is_empty() {
            return Err(RelationshipError::not_found(format!(
                "Node does not have any {} collections",
                relation
            )));
        }
        let index = find_collection(collections, collection_name).ok_or_else(|| {
            RelationshipError::not_found(format!(
                "Collection \"{}\" not found in {}",
                collection_name, relation
            ))
        })?;
        let count = collections[index].nodes.len();
        if count > 0 {
            return Err(RelationshipError::conflict(format!(
                "Cannot delete collection \"{}\" because it contains {} nodes. \
                 Please move or remove these nodes before deleting the collection.",
                collection_name, count
            )));
        }

        let node = ws.require_mut(node_id)?;
        let collections = node.relation_mut(relation);
        collections.remove(index);
        ensure_main(collections);
        node.add_contributor(user, None);

        let updated = node.clone();
        self.commit_collection_change(
            ws,
            &primary,
            &updated,
            relation,
            user,
            reasoning,
            ChangeType::DeleteCollection,
        )
        .await?;
        tracing::info!(node_id, relation = %relation, collection = collection_name, "Collection deleted");
        Ok(updated)
    }

    /// Rename a specialization collection in place, preserving its members and order
    ///
    /// # Errors
    ///
    /// - "Collection names cannot be empty"
    /// - "Cannot rename the main collection"
    /// - "New collection name must be different from the old name"
    /// - "Collection 'X' not found" / "Collection 'X' already exists"
    pub async fn update_specialization_collection(
        &self,
        node_id: &str,
        old_name: &str,
        new_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        traced(
            "update_specialization_collection",
            node_id,
            self.rename_collection(
                node_id,
                RelationType::Specializations,
                old_name,
                new_name,
                user,
                reasoning,
            )
            .await,
        )
    }

    async fn rename_collection(
        &self,
        node_id: &str,
        relation: RelationType,
        old_name: &str,
        new_name: &str,
        user: &str,
        reasoning: &str,
    ) -> Result<Node, RelationshipError> {
        self.validate_node_id(node_id)?;
        if old_name.trim().is_empty() || new_name.trim().is_empty() {
            return Err(RelationshipError::invalid_input(
                "Collection names cannot be empty",
            ));
        }
        if is_reserved_collection(old_name) {
            return Err(RelationshipError::conflict("Cannot rename the main collection"));
        }
        if old_name == new_name {
            return Err(RelationshipError::invalid_input(
                "New collection name must be different from the old name",
            ));
        }
        if is_reserved_collection(new_name) {
            return Err(RelationshipError::conflict(RESERVED_CREATE_MESSAGE));
        }
        self.validate_collection_name_length(new_name)?;
        self.validate_user(user)?;
        self.validate_reasoning(reasoning)?;

        let (mut ws, primary) = self.load_for_collection_change(node_id).await?;

        let collections = primary.relation(relation);
        let index = find_collection(collections, old_name).ok_or_else(|| {
            RelationshipError::not_found(format!("Collection '{}' not found", old_name))
        })?;
        if find_collection(collections, new_name).is_some() {
            return Err(RelationshipError::conflict(format!(
                "Collection '{}' already exists",
                new_name
            )));
        }

        let node = ws.require_mut(node_id)?;
        let collections = node.relation_mut(relation);
        collections[index].collection_name = new_name.to_string();
        ensure_main(collections);
        node.add_contributor(user, Some(relation.as_str()));

        let updated = node.clone();
        self.commit_collection_change(
            ws,
            &primary,
            &updated,
            relation,
            user,
            reasoning,
            ChangeType::EditCollection,
        )
        .await?;
        tracing::info!(node_id, from = old_name, to = new_name, "Collection renamed");
        Ok(updated)
    }

    async fn load_for_collection_change(
        &self,
        node_id: &str,
    ) -> Result<(WorkingSet, Node), RelationshipError> {
        let mut ws = self.begin().await?;
        let primary = self
            .load_primary(
                &mut ws,
                node_id,
                || RelationshipError::node_not_found(node_id),
                || RelationshipError::deleted_node(node_id),
            )
            .await?;
        Ok((ws, primary))
    }

    #[allow(clippy::too_many_arguments)]
    async fn commit_collection_change(
        &self,
        mut ws: WorkingSet,
        before: &Node,
        after: &Node,
        relation: RelationType,
        user: &str,
        reasoning: &str,
        change_type: ChangeType,
    ) -> Result<(), RelationshipError> {
        ws.record(
            ChangelogEntry::new(after, user, change_type, reasoning).with_values(
                relation.as_str(),
                snapshot(&before.relation(relation))?,
                snapshot(&after.relation(relation))?,
            ),
        );
        self.finish(ws, Vec::new()).await?;
        Ok(())
    }
}
