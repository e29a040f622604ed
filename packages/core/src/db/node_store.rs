//! NodeStore Trait - Transactional Document Store Abstraction
//!
//! This module defines the `NodeStore` and `NodeTransaction` traits the
//! relationship engine runs against. A store hands out transactions; every
//! engine operation runs inside exactly one of them.
//!
//! # Architecture
//!
//! - **Abstraction Point**: Between `RelationshipService` (business logic) and the document store
//! - **Reads Before Writes**: A transaction refuses reads once it has buffered a write
//! - **All Or Nothing**: Node patches and audit records become visible together at commit
//! - **No Retries**: Conflicts surface to the caller as `DatabaseError::TransactionConflict`
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so network-backed stores fit the same seam
//! 2. **Ownership Semantics**: Writes take ownership of patches and entries
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context; typed
//!    failures are `DatabaseError` values inside the `anyhow::Error`
//!
//! # Examples
//!
//! ```rust
//! use nodegraph_core::db::{MemoryNodeStore, NodeStore};
//! use nodegraph_core::models::{Node, NodePatch};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store = MemoryNodeStore::new();
//! store.insert(Node::new("n1", "Node", "concept")).await;
//!
//! let mut txn = store.begin().await?;
//! let node = txn.get("n1").await?.expect("seeded");
//! txn.update(&node.id, NodePatch {
//!     pending_inheritance_update: Some(true),
//!     ..Default::default()
//! })
//! .await?;
//! txn.commit().await?;
//!
//! assert!(store.get("n1").await.unwrap().pending_inheritance_update);
//! # Ok(())
//! # }
//! ```

use crate::models::{ChangelogEntry, Node, NodePatch};
use anyhow::Result;
use async_trait::async_trait;

/// Source of transactions over node documents
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one store can be shared by many
/// concurrently running service calls.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Open a new transaction
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot start a transaction.
    async fn begin(&self) -> Result<Box<dyn NodeTransaction>>;
}

/// One atomic unit of work
///
/// Dropping a transaction without calling `commit` discards every buffered
/// write and audit record.
#[async_trait]
pub trait NodeTransaction: Send {
    /// Read a node document
    ///
    /// # Returns
    ///
    /// `Some(node)` if the document exists, `None` otherwise
    ///
    /// # Errors
    ///
    /// - `DatabaseError::ReadAfterWrite` if `update` was already called
    /// - `DatabaseError::TransactionClosed` after commit
    async fn get(&mut self, id: &str) -> Result<Option<Node>>;

    /// Buffer a partial update for a node
    ///
    /// Only the fields present in `patch` change. Multiple patches for the same
    /// node are applied in call order.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::DocumentNotFound` if the node does not exist
    /// - `DatabaseError::TransactionClosed` after commit
    async fn update(&mut self, id: &str, patch: NodePatch) -> Result<()>;

    /// Stage an audit record to be persisted with the commit
    async fn record_change(&mut self, entry: ChangelogEntry) -> Result<()>;

    /// Apply every buffered write and audit record atomically
    ///
    /// # Errors
    ///
    /// `DatabaseError::TransactionConflict` if any document read by this
    /// transaction was changed by another transaction since it was read. In that
    /// case nothing is applied.
    async fn commit(&mut self) -> Result<()>;
}
