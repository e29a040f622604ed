//! Relationship Collections
//!
//! A node keeps each relationship direction (`generalizations`,
//! `specializations`) as an ordered list of named collections. Every list
//! carries a reserved `main` collection that can never be renamed or deleted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::node::ValidationError;

/// Name of the reserved default collection
pub const MAIN_COLLECTION: &str = "main";

/// Returns true if `name` is the reserved `main` collection (case-insensitive)
///
/// ```
/// use nodegraph_core::models::is_reserved_collection;
///
/// assert!(is_reserved_collection("main"));
/// assert!(is_reserved_collection(" Main "));
/// assert!(!is_reserved_collection("mainframe"));
/// ```
pub fn is_reserved_collection(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(MAIN_COLLECTION)
}

/// Resolve a requested target collection, folding reserved spellings onto `main`
///
/// ```
/// use nodegraph_core::models::{canonical_collection_name, MAIN_COLLECTION};
///
/// assert_eq!(canonical_collection_name("Main"), MAIN_COLLECTION);
/// assert_eq!(canonical_collection_name("parts"), "parts");
/// ```
pub fn canonical_collection_name(name: &str) -> &str {
    if is_reserved_collection(name) {
        MAIN_COLLECTION
    } else {
        name
    }
}

/// The two mirrored relationship arrays stored on every node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    /// Children of the node (is-a-parent-of)
    Specializations,
    /// Parents of the node (is-a-child-of)
    Generalizations,
}

impl RelationType {
    /// Field name used in documents, changelog entries and contributor maps
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Specializations => "specializations",
            RelationType::Generalizations => "generalizations",
        }
    }

    /// The array on the other endpoint that mirrors this one
    pub fn inverse(&self) -> RelationType {
        match self {
            RelationType::Specializations => RelationType::Generalizations,
            RelationType::Generalizations => RelationType::Specializations,
        }
    }

    /// Singular label used in validation messages ("specialization")
    pub fn singular(&self) -> &'static str {
        match self {
            RelationType::Specializations => "specialization",
            RelationType::Generalizations => "generalization",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "specializations" => Ok(RelationType::Specializations),
            "generalizations" => Ok(RelationType::Generalizations),
            other => Err(ValidationError::InvalidRelationType(other.to_string())),
        }
    }
}

/// Reference to the node on the other end of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: String,
}

impl NodeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl From<&str> for NodeRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Named, ordered group of edge references within one relationship array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub collection_name: String,
    #[serde(default)]
    pub nodes: Vec<NodeRef>,
}

impl Collection {
    /// Create an empty collection
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            nodes: Vec::new(),
        }
    }

    /// Create the empty reserved `main` collection
    pub fn main() -> Self {
        Self::new(MAIN_COLLECTION)
    }

    /// Create a collection holding the given ids in order
    pub fn with_nodes<I, S>(collection_name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection_name: collection_name.into(),
            nodes: ids.into_iter().map(|id| NodeRef::new(id)).collect(),
        }
    }

    pub fn is_main(&self) -> bool {
        self.collection_name == MAIN_COLLECTION
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Member ids in order
    pub fn ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }
}

/// Index of the collection named `name`, if any
pub fn find_collection(collections: &[Collection], name: &str) -> Option<usize> {
    collections.iter().position(|c| c.collection_name == name)
}

/// Guarantee the reserved `main` collection exists, appending it if missing
///
/// Returns true if the list was modified.
pub fn ensure_main(collections: &mut Vec<Collection>) -> bool {
    if collections.iter().any(Collection::is_main) {
        return false;
    }
    collections.push(Collection::main());
    true
}

/// All member ids across every collection, in collection order then node order
pub fn all_ids(collections: &[Collection]) -> Vec<&str> {
    collections
        .iter()
        .flat_map(|c| c.nodes.iter().map(|n| n.id.as_str()))
        .collect()
}

/// True if `id` appears in any collection
pub fn contains_anywhere(collections: &[Collection], id: &str) -> bool {
    collections.iter().any(|c| c.contains(id))
}
