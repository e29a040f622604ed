//! Data Models
//!
//! This module contains the document shapes the relationship engine reads and writes:
//!
//! - `Node` - A concept with mirrored generalization/specialization arrays
//! - `Collection` - Named, ordered group of edges inside one relationship array
//! - `NodePatch` - Partial update applied by the node repository
//! - `ChangelogEntry` - Immutable audit record for every committed change

mod changelog;
mod collection;
mod node;

pub use changelog::{ChangeType, ChangelogEntry, DragPosition, SortDetails};
pub use collection::{
    all_ids, canonical_collection_name, contains_anywhere, ensure_main, find_collection,
    is_reserved_collection, Collection, NodeRef, RelationType, MAIN_COLLECTION,
};
pub use node::{InheritanceRule, InheritanceType, Node, NodePatch, ValidationError};
