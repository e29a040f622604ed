//! Business Services
//!
//! This module contains the relationship engine:
//!
//! - `RelationshipService` - Public operations over the concept graph
//! - `cycle_guard` - Acyclicity check for proposed generalization edges
//! - `edge_mutator` - Pure collection primitives applied to both edge endpoints
//! - `inheritance` - Property propagation when generalizations change
//!
//! Operations are grouped by area (`specializations`, `generalizations`,
//! `collections`, `transfer`) as `impl RelationshipService` blocks; all of them
//! share one transactional working set per call.

mod collections;
pub mod cycle_guard;
pub mod edge_mutator;
mod edges;
pub mod error;
mod generalizations;
pub mod inheritance;
pub mod relationship_service;
mod specializations;
mod transfer;
mod working_set;

pub use cycle_guard::{would_create_cycle, AncestryReader};
pub use error::RelationshipError;
pub use relationship_service::RelationshipService;
pub use transfer::TransferResult;
