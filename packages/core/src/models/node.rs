//! Node Data Structures
//!
//! This module defines the `Node` document stored for every concept in the
//! knowledge graph, together with the inheritance metadata that tracks where
//! each property value came from.
//!
//! # Architecture
//!
//! - **Fixed schema**: unknown document fields are rejected at deserialization
//!   time, so the engine only ever sees well-formed nodes
//! - **Mirrored edges**: `generalizations` and `specializations` are two
//!   independently stored arrays that the engine keeps consistent
//! - **Partial writes**: `NodePatch` carries only the fields an operation changed
//!
//! # Examples
//!
//! ```rust
//! use nodegraph_core::models::{InheritanceRule, InheritanceType, Node};
//! use serde_json::json;
//!
//! let mut vehicle = Node::new("vehicle", "Vehicle", "concept");
//! vehicle.set_property(
//!     "wheels",
//!     json!(4),
//!     Some("number"),
//!     InheritanceRule::native(InheritanceType::AlwaysInherit),
//! );
//!
//! assert!(vehicle.has_property("wheels"));
//! assert_eq!(vehicle.generalizations[0].collection_name, "main");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::collection::{all_ids, Collection, RelationType};

/// Validation errors for node-level values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid relation type: {0}")]
    InvalidRelationType(String),

    #[error("Invalid inheritance type: {0}")]
    InvalidInheritanceType(String),
}

/// How a property flows from an ancestor to its specializations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InheritanceType {
    /// Always copied onto descendants, overwriting their value
    AlwaysInherit,
    /// Copied only when the descendant does not already own the property
    InheritUnlessAlreadyOverRidden,
    /// Never copied
    NeverInherit,
}

impl InheritanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InheritanceType::AlwaysInherit => "alwaysInherit",
            InheritanceType::InheritUnlessAlreadyOverRidden => "inheritUnlessAlreadyOverRidden",
            InheritanceType::NeverInherit => "neverInherit",
        }
    }
}

impl std::str::FromStr for InheritanceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alwaysInherit" => Ok(InheritanceType::AlwaysInherit),
            "inheritUnlessAlreadyOverRidden" => Ok(InheritanceType::InheritUnlessAlreadyOverRidden),
            "neverInherit" => Ok(InheritanceType::NeverInherit),
            other => Err(ValidationError::InvalidInheritanceType(other.to_string())),
        }
    }
}

/// Inheritance metadata for one property
///
/// `source` is the id of the ancestor currently supplying the value. It is
/// `None` (or an empty string in legacy documents) for native properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritanceRule {
    pub inheritance_type: InheritanceType,
    #[serde(rename = "ref", default)]
    pub source: Option<String>,
}

impl InheritanceRule {
    /// Rule for a property owned by the node itself
    pub fn native(inheritance_type: InheritanceType) -> Self {
        Self {
            inheritance_type,
            source: None,
        }
    }

    /// Rule recorded on a descendant that received the value from `ancestor_id`
    pub fn inherited_from(ancestor_id: impl Into<String>) -> Self {
        Self {
            inheritance_type: InheritanceType::InheritUnlessAlreadyOverRidden,
            source: Some(ancestor_id.into()),
        }
    }

    /// Ancestor id, ignoring empty references
    pub fn source_id(&self) -> Option<&str> {
        self.source.as_deref().filter(|s| !s.is_empty())
    }
}

/// A concept in the knowledge graph.
///
/// # Fields
///
/// - `id`: Stable identifier
/// - `title`, `node_type`: Descriptive metadata
/// - `deleted`: Tombstone; deleted nodes are read-only to the engine
/// - `generalizations` / `specializations`: Mirrored edge arrays, each with a `main` collection
/// - `properties`, `property_type`, `inheritance`: Property values, type tags and provenance
/// - `contributors`, `contributors_by_property`: Users who modified the node
/// - `pending_inheritance_update`: Set when deferred inheritance recomputation is queued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Node {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub node_type: String,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default)]
    pub generalizations: Vec<Collection>,

    #[serde(default)]
    pub specializations: Vec<Collection>,

    #[serde(default)]
    pub properties: BTreeMap<String, Value>,

    #[serde(default)]
    pub property_type: BTreeMap<String, String>,

    #[serde(default)]
    pub inheritance: BTreeMap<String, InheritanceRule>,

    #[serde(default)]
    pub contributors: Vec<String>,

    #[serde(default)]
    pub contributors_by_property: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_inheritance_update: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Node {
    /// Create a node with empty `main` collections in both directions
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            node_type: node_type.into(),
            deleted: false,
            generalizations: vec![Collection::main()],
            specializations: vec![Collection::main()],
            properties: BTreeMap::new(),
            property_type: BTreeMap::new(),
            inheritance: BTreeMap::new(),
            contributors: Vec::new(),
            contributors_by_property: BTreeMap::new(),
            pending_inheritance_update: false,
            updated_at: None,
            updated_by: None,
        }
    }

    pub fn relation(&self, relation: RelationType) -> &[Collection] {
        match relation {
            RelationType::Specializations => &self.specializations,
            RelationType::Generalizations => &self.generalizations,
        }
    }

    pub fn relation_mut(&mut self, relation: RelationType) -> &mut Vec<Collection> {
        match relation {
            RelationType::Specializations => &mut self.specializations,
            RelationType::Generalizations => &mut self.generalizations,
        }
    }

    /// Every id linked through `relation`, in collection order then node order
    pub fn linked_ids(&self, relation: RelationType) -> Vec<&str> {
        all_ids(self.relation(relation))
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Ancestor currently supplying `name`, if the property is inherited
    pub fn inherited_from(&self, name: &str) -> Option<&str> {
        self.inheritance.get(name).and_then(InheritanceRule::source_id)
    }

    /// Inheritance type the node declares for `name`
    pub fn inheritance_type_of(&self, name: &str) -> Option<InheritanceType> {
        self.inheritance.get(name).map(|rule| rule.inheritance_type)
    }

    /// Set a property with its type tag and inheritance rule
    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: Value,
        property_type: Option<&str>,
        rule: InheritanceRule,
    ) {
        let name = name.into();
        if let Some(property_type) = property_type {
            self.property_type
                .insert(name.clone(), property_type.to_string());
        }
        self.inheritance.insert(name.clone(), rule);
        self.properties.insert(name, value);
    }

    /// Remove a property together with its type and inheritance entries
    pub fn remove_property(&mut self, name: &str) {
        self.properties.remove(name);
        self.property_type.remove(name);
        self.inheritance.remove(name);
    }

    /// Record `user` as a contributor of the node and, optionally, of one property
    pub fn add_contributor(&mut self, user: &str, property: Option<&str>) {
        if !self.contributors.iter().any(|c| c == user) {
            self.contributors.push(user.to_string());
        }
        if let Some(property) = property {
            let users = self
                .contributors_by_property
                .entry(property.to_string())
                .or_default();
            if !users.iter().any(|c| c == user) {
                users.push(user.to_string());
            }
        }
    }

    /// Apply a partial update in place
    pub fn apply_patch(&mut self, patch: NodePatch) {
        if let Some(generalizations) = patch.generalizations {
            self.generalizations = generalizations;
        }
        if let Some(specializations) = patch.specializations {
            self.specializations = specializations;
        }
        if let Some(properties) = patch.properties {
            self.properties = properties;
        }
        if let Some(property_type) = patch.property_type {
            self.property_type = property_type;
        }
        if let Some(inheritance) = patch.inheritance {
            self.inheritance = inheritance;
        }
        if let Some(contributors) = patch.contributors {
            self.contributors = contributors;
        }
        if let Some(contributors_by_property) = patch.contributors_by_property {
            self.contributors_by_property = contributors_by_property;
        }
        if let Some(pending) = patch.pending_inheritance_update {
            self.pending_inheritance_update = pending;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
        if let Some(updated_by) = patch.updated_by {
            self.updated_by = Some(updated_by);
        }
    }
}

/// Partial update for a node; `None` leaves the field untouched
///
/// Only the fields the engine is allowed to mutate are representable, so a
/// patch can never change a node's identity, metadata or tombstone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generalizations: Option<Vec<Collection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specializations: Option<Vec<Collection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inheritance: Option<BTreeMap<String, InheritanceRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors_by_property: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_inheritance_update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl NodePatch {
    /// Build the patch that turns `before` into `after`
    ///
    /// Fields outside the patchable set are ignored.
    pub fn diff(before: &Node, after: &Node) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }

        Self {
            generalizations: changed(&before.generalizations, &after.generalizations),
            specializations: changed(&before.specializations, &after.specializations),
            properties: changed(&before.properties, &after.properties),
            property_type: changed(&before.property_type, &after.property_type),
            inheritance: changed(&before.inheritance, &after.inheritance),
            contributors: changed(&before.contributors, &after.contributors),
            contributors_by_property: changed(
                &before.contributors_by_property,
                &after.contributors_by_property,
            ),
            pending_inheritance_update: changed(
                &before.pending_inheritance_update,
                &after.pending_inheritance_update,
            ),
            updated_at: changed(&before.updated_at, &after.updated_at).flatten(),
            updated_by: changed(&before.updated_by, &after.updated_by).flatten(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
