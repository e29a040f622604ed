//! Domain Events for the Relationship Engine
//!
//! This module defines the domain events published by `RelationshipService`
//! after a transaction commits. Subscribers (sync layers, the deferred
//! inheritance worker) observe graph changes without coupling to the store.
//!
//! # Architecture
//!
//! Events are emitted using tokio's broadcast channel, allowing multiple subscribers
//! to receive notifications asynchronously. Nothing is published for an operation
//! that fails or writes nothing.
//!
//! # Event Flow
//!
//! 1. `RelationshipService` commits one transaction
//! 2. `NodeUpdated` is emitted for every written node
//! 3. `InheritanceUpdateQueued` is emitted for every node whose inheritance must be
//!    recomputed out of band (the node already carries `pendingInheritanceUpdate`)

use serde::{Deserialize, Serialize};

/// Why a node was queued for deferred inheritance recomputation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InheritanceTrigger {
    /// The node was moved from one generalization to another
    #[serde(rename = "specializationTransferred", rename_all = "camelCase")]
    SpecializationTransferred { from: String, to: String },

    /// One of the node's generalizations changed its inherited properties
    #[serde(rename = "ancestorChanged", rename_all = "camelCase")]
    AncestorChanged { ancestor_id: String },
}

/// Work-queue item for the deferred inheritance worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritanceWorkItem {
    pub node_id: String,
    pub trigger: InheritanceTrigger,
}

/// Domain events emitted after a committed relationship operation
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A node document was written
    NodeUpdated {
        id: String,
        source_client_id: Option<String>,
    },

    /// A node needs its inheritance recomputed
    InheritanceUpdateQueued {
        item: InheritanceWorkItem,
        source_client_id: Option<String>,
    },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::NodeUpdated { .. } => "node:updated",
            DomainEvent::InheritanceUpdateQueued { .. } => "inheritance:queued",
        }
    }

    pub fn source_client_id(&self) -> Option<&str> {
        match self {
            DomainEvent::NodeUpdated {
                source_client_id, ..
            }
            | DomainEvent::InheritanceUpdateQueued {
                source_client_id, ..
            } => source_client_id.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contract test: the work item is consumed outside this crate, so its JSON
    /// shape is pinned here. The trigger is internally tagged (flat, not nested).
    #[test]
    fn test_work_item_serialization_contract() {
        let item = InheritanceWorkItem {
            node_id: "spec-1".to_string(),
            trigger: InheritanceTrigger::SpecializationTransferred {
                from: "source-id".to_string(),
                to: "target-id".to_string(),
            },
        };

        let parsed = serde_json::to_value(&item).unwrap();
        assert_eq!(parsed["nodeId"], "spec-1");
        assert_eq!(parsed["trigger"]["type"], "specializationTransferred");
        assert_eq!(parsed["trigger"]["from"], "source-id");
        assert_eq!(parsed["trigger"]["to"], "target-id");
        assert!(parsed["trigger"].get("specializationTransferred").is_none());

        let ancestor = InheritanceTrigger::AncestorChanged {
            ancestor_id: "parent-id".to_string(),
        };
        let parsed = serde_json::to_value(&ancestor).unwrap();
        assert_eq!(parsed["type"], "ancestorChanged");
        assert_eq!(parsed["ancestorId"], "parent-id");
    }

    #[test]
    fn test_work_item_deserialization() {
        let json = r#"{"nodeId":"n1","trigger":{"type":"ancestorChanged","ancestorId":"p1"}}"#;
        let item: InheritanceWorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(
            item.trigger,
            InheritanceTrigger::AncestorChanged {
                ancestor_id: "p1".to_string()
            }
        );
    }

    #[test]
    fn test_event_accessors() {
        let event = DomainEvent::NodeUpdated {
            id: "n1".to_string(),
            source_client_id: Some("window-1".to_string()),
        };
        assert_eq!(event.event_type(), "node:updated");
        assert_eq!(event.source_client_id(), Some("window-1"));
    }
}
