//! NodeGraph Core: relationship and inheritance engine
//!
//! This crate maintains a directed acyclic graph of concept nodes. Every edge
//! is stored twice: the parent lists the child in one of its named
//! `specializations` collections, the child lists the parent in its
//! `generalizations.main`. Properties flow down generalization edges according
//! to per-property inheritance rules.
//!
//! # Architecture
//!
//! - **Document store**: nodes are whole documents read and written through a
//!   transactional [`db::NodeStore`]; every operation is one transaction
//! - **Reads before writes**: all documents are loaded first, mutated in memory,
//!   then flushed together with their audit records
//! - **Events after commit**: subscribers receive [`db::DomainEvent`]s for
//!   written nodes and deferred inheritance work
//!
//! # Modules
//!
//! - [`models`] - Node, Collection, ChangelogEntry
//! - [`services`] - `RelationshipService` and its building blocks
//! - [`db`] - Store and transaction traits, in-memory store, domain events
//! - [`config`] - Engine limits
//! - [`logging`] - `tracing` subscriber setup

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::RelationshipConfig;
pub use db::{DomainEvent, MemoryNodeStore, NodeStore};
pub use models::*;
pub use services::{RelationshipError, RelationshipService, TransferResult};
