//! Database Layer
//!
//! This module defines the transactional document store the relationship engine
//! runs against:
//!
//! - `NodeStore` / `NodeTransaction` - Repository, transaction and audit-log seam
//! - `MemoryNodeStore` - In-memory implementation with optimistic concurrency
//! - `DomainEvent` - Notifications published after a commit
//!
//! # Architecture
//!
//! The engine never talks to a concrete backend. Every operation opens one
//! transaction from an `Arc<dyn NodeStore>`, performs all of its reads, then
//! buffers its writes and audit records, and commits once.

mod error;
pub mod events;
mod memory_store;
mod node_store;

pub use error::DatabaseError;
pub use events::{DomainEvent, InheritanceTrigger, InheritanceWorkItem};
pub use memory_store::MemoryNodeStore;
pub use node_store::{NodeStore, NodeTransaction};
