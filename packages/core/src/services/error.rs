//! Service Layer Error Types
//!
//! This module defines the error type returned by every `RelationshipService`
//! operation. The `Display` text of each non-database variant is the stable,
//! user-facing message; callers match on literal substrings of it.

use crate::db::DatabaseError;
use crate::models::{RelationType, ValidationError};
use thiserror::Error;

/// Relationship engine errors
///
/// Every error aborts the enclosing transaction before any write is applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelationshipError {
    /// Malformed request (empty ids, empty lists, limits exceeded)
    #[error("{0}")]
    InvalidInput(String),

    /// A referenced node or collection does not exist
    #[error("{0}")]
    NotFound(String),

    /// The request contradicts current state (deleted node, reserved name, ...)
    #[error("{0}")]
    Conflict(String),

    /// The change would make a node its own ancestor
    #[error("{0}")]
    CircularReference(String),

    /// Store failure, including transaction conflicts
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Audit snapshot could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lazily built engine resource failed to initialize
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl RelationshipError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn circular_reference(msg: impl Into<String>) -> Self {
        Self::CircularReference(msg.into())
    }

    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn initialization_error(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Primary node missing, e.g. "Node abc not found"
    pub fn node_not_found(id: &str) -> Self {
        Self::not_found(format!("Node {} not found", id))
    }

    /// Edge endpoint missing, e.g. "Specialization node abc not found"
    pub fn related_node_not_found(relation: RelationType, id: &str) -> Self {
        Self::not_found(format!("{} node {} not found", capitalize(relation.singular()), id))
    }

    /// Edge endpoint is tombstoned
    pub fn related_node_deleted(relation: RelationType, id: &str) -> Self {
        let singular = relation.singular();
        Self::conflict(format!(
            "{} node {} is deleted and cannot be added as a {}",
            capitalize(singular),
            id,
            singular
        ))
    }

    /// Primary node is tombstoned, e.g. "Cannot update deleted node abc"
    pub fn deleted_node(id: &str) -> Self {
        Self::conflict(format!("Cannot update deleted node {}", id))
    }

    /// Primary node is tombstoned (collection-level operations)
    pub fn cannot_modify_deleted() -> Self {
        Self::conflict("Cannot modify a deleted node")
    }

    pub fn username_required() -> Self {
        Self::invalid_input("Username is required")
    }

    pub fn invalid_node_id() -> Self {
        Self::invalid_input("Invalid node ID")
    }

    /// True when retrying the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(e) if e.is_retryable())
    }
}

impl From<ValidationError> for RelationshipError {
    fn from(e: ValidationError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

/// Convert a store error, keeping typed `DatabaseError`s intact
pub(crate) fn db_error(e: anyhow::Error, context: &str) -> RelationshipError {
    match e.downcast::<DatabaseError>() {
        Ok(db) => RelationshipError::Database(db),
        Err(other) => RelationshipError::Database(DatabaseError::storage(format!(
            "{}: {}",
            context, other
        ))),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
