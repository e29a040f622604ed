//! Database Error Types
//!
//! This module defines error types for transactional store operations, providing
//! clear error handling for conflicts, ordering violations and storage failures.

use thiserror::Error;

/// Database operation errors
///
/// Covers the failure modes of a `NodeTransaction`. Stores return these wrapped
/// in `anyhow::Error`; the service layer recovers them by downcasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatabaseError {
    /// Another transaction modified a document this transaction read
    #[error("Transaction conflict on node {node_id}")]
    TransactionConflict { node_id: String },

    /// A read was attempted after the transaction had already buffered a write
    #[error("Read of node {node_id} attempted after a write in the same transaction")]
    ReadAfterWrite { node_id: String },

    /// A write targeted a document that does not exist
    #[error("Document {node_id} does not exist")]
    DocumentNotFound { node_id: String },

    /// The transaction was already committed
    #[error("Transaction is already closed")]
    TransactionClosed,

    /// Backend failure with context
    #[error("Storage operation failed: {context}")]
    StorageError { context: String },
}

impl DatabaseError {
    /// Create a transaction conflict error
    pub fn conflict(node_id: impl Into<String>) -> Self {
        Self::TransactionConflict {
            node_id: node_id.into(),
        }
    }

    /// Create a read-after-write error
    pub fn read_after_write(node_id: impl Into<String>) -> Self {
        Self::ReadAfterWrite {
            node_id: node_id.into(),
        }
    }

    /// Create a document not found error
    pub fn document_not_found(node_id: impl Into<String>) -> Self {
        Self::DocumentNotFound {
            node_id: node_id.into(),
        }
    }

    /// Create a storage error with context
    pub fn storage(context: impl Into<String>) -> Self {
        Self::StorageError {
            context: context.into(),
        }
    }

    /// True for errors a caller may resolve by retrying the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. })
    }
}
