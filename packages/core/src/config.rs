//! Configuration for the relationship engine
use serde::{Deserialize, Serialize};

/// Limits applied by `RelationshipService`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Largest node list a single operation accepts
    pub max_nodes_per_operation: usize,

    /// Longest collection name that may be created, renamed to, or targeted
    pub max_collection_name_length: usize,

    /// Longest free-text reasoning accepted with a change
    pub max_reasoning_length: usize,

    /// Upper bound on nodes visited by one cycle check
    pub max_traversal_nodes: usize,

    /// Capacity of the domain event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            max_nodes_per_operation: 100,
            max_collection_name_length: 50,
            max_reasoning_length: 1000,
            max_traversal_nodes: 10_000,
            event_channel_capacity: 128,
        }
    }
}

impl RelationshipConfig {
    /// Parse a JSON document; missing fields take their default values
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_nodes_per_operation == 0 {
            return Err("max_nodes_per_operation must be greater than 0".to_string());
        }

        if self.max_collection_name_length == 0 {
            return Err("max_collection_name_length must be greater than 0".to_string());
        }

        if self.max_reasoning_length == 0 {
            return Err("max_reasoning_length must be greater than 0".to_string());
        }

        if self.max_traversal_nodes == 0 {
            return Err("max_traversal_nodes must be greater than 0".to_string());
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelationshipConfig::default();
        assert_eq!(config.max_nodes_per_operation, 100);
        assert_eq!(config.max_collection_name_length, 50);
        assert_eq!(config.max_reasoning_length, 1000);
        assert_eq!(config.max_traversal_nodes, 10_000);
        assert_eq!(config.event_channel_capacity, 128);
    }

    #[test]
    fn test_config_validation() {
        let mut config = RelationshipConfig::default();

        // Valid config
        assert!(config.validate().is_ok());

        // Invalid: zero node limit
        config.max_nodes_per_operation = 0;
        assert!(config.validate().is_err());

        // Invalid: zero traversal bound
        config.max_nodes_per_operation = 10;
        config.max_traversal_nodes = 0;
        assert!(config.validate().is_err());

        // Invalid: zero channel capacity
        config.max_traversal_nodes = 10;
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RelationshipConfig::from_json_str(r#"{"max_nodes_per_operation": 5}"#).unwrap();
        assert_eq!(config.max_nodes_per_operation, 5);
        assert_eq!(config.max_reasoning_length, 1000);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        assert!(RelationshipConfig::from_json_str("not json").is_err());
        let err = RelationshipConfig::from_json_str(r#"{"max_reasoning_length": 0}"#).unwrap_err();
        assert!(err.contains("max_reasoning_length"));
    }
}
