//! Changelog (Audit Log) Records
//!
//! Every logical change the relationship engine commits is described by one
//! immutable `ChangelogEntry`: who changed which node, which field, the values
//! before and after, and the free-text reasoning supplied by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::node::Node;

/// Kind of change recorded in the changelog
///
/// Serializes to the human-readable strings stored alongside historic entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    #[serde(rename = "add element")]
    AddElement,
    #[serde(rename = "remove element")]
    RemoveElement,
    #[serde(rename = "edit collection")]
    EditCollection,
    #[serde(rename = "sort elements")]
    SortElements,
    #[serde(rename = "add collection")]
    AddCollection,
    #[serde(rename = "delete collection")]
    DeleteCollection,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::AddElement => "add element",
            ChangeType::RemoveElement => "remove element",
            ChangeType::EditCollection => "edit collection",
            ChangeType::SortElements => "sort elements",
            ChangeType::AddCollection => "add collection",
            ChangeType::DeleteCollection => "delete collection",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an element inside a relationship array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPosition {
    /// Index of the collection within its array, as a string
    pub droppable_id: String,
    pub index: usize,
}

/// Structured move metadata carried by reorder entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortDetails {
    pub draggable_node_id: String,
    pub source: DragPosition,
    pub destination: DragPosition,
}

impl SortDetails {
    pub fn new(
        draggable_node_id: impl Into<String>,
        collection_index: usize,
        from: usize,
        to: usize,
    ) -> Self {
        let droppable_id = collection_index.to_string();
        Self {
            draggable_node_id: draggable_node_id.into(),
            source: DragPosition {
                droppable_id: droppable_id.clone(),
                index: from,
            },
            destination: DragPosition {
                droppable_id,
                index: to,
            },
        }
    }
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: String,
    pub node_id: String,
    pub modified_by: String,
    pub modified_property: Option<String>,
    pub previous_value: Value,
    pub new_value: Value,
    pub modified_at: DateTime<Utc>,
    pub change_type: ChangeType,
    /// Snapshot of the node after the change
    pub full_node: Node,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_details: Option<SortDetails>,
}

impl ChangelogEntry {
    /// Create an entry stamped with a fresh id and the current time
    pub fn new(
        node: &Node,
        modified_by: impl Into<String>,
        change_type: ChangeType,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            node_id: node.id.clone(),
            modified_by: modified_by.into(),
            modified_property: None,
            previous_value: Value::Null,
            new_value: Value::Null,
            modified_at: Utc::now(),
            change_type,
            full_node: node.clone(),
            reasoning: reasoning.into(),
            change_details: None,
        }
    }

    /// Attach the modified field and its before/after values
    pub fn with_values(
        mut self,
        property: impl Into<String>,
        previous_value: Value,
        new_value: Value,
    ) -> Self {
        self.modified_property = Some(property.into());
        self.previous_value = previous_value;
        self.new_value = new_value;
        self
    }

    pub fn with_details(mut self, details: Option<SortDetails>) -> Self {
        self.change_details = details;
        self
    }
}
