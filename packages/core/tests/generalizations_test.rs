//! Generalization & Inheritance Tests
//!
//! Integration tests for the child-side edge operations and the property
//! inheritance they trigger.
//!
//! ## Inheritance Rules
//! - `alwaysInherit` - copied onto the child, overwriting its value
//! - `inheritUnlessAlreadyOverRidden` - copied only if the child lacks the property
//! - `neverInherit` - never copied
//!
//! Copies are recorded on the child as `inheritUnlessAlreadyOverRidden` with
//! `ref` naming the ancestor. Removing that ancestor re-sources the property
//! from the first remaining ancestor that owns it, or drops it.

#[cfg(test)]
mod generalizations_tests {
    use std::sync::Arc;

    use anyhow::Result;
    use nodegraph_core::db::MemoryNodeStore;
    use nodegraph_core::models::{
        ChangeType, Collection, InheritanceRule, InheritanceType, Node, NodeRef, MAIN_COLLECTION,
    };
    use nodegraph_core::services::{RelationshipError, RelationshipService};
    use serde_json::json;

    const USER: &str = "test-user";
    const REASON: &str = "refining the hierarchy";

    fn concept(id: &str) -> Node {
        Node::new(id, id, "concept")
    }

    fn refs(ids: &[&str]) -> Vec<NodeRef> {
        ids.iter().copied().map(NodeRef::from).collect()
    }

    fn native(node: &mut Node, name: &str, value: serde_json::Value, rule: InheritanceType) {
        node.set_property(name, value, Some("text"), InheritanceRule::native(rule));
    }

    /// Link `child` under `parents` (both halves, in order)
    fn link(nodes: &mut [Node], child_id: &str, parents: &[&str]) {
        for node in nodes.iter_mut() {
            if node.id == child_id {
                node.generalizations =
                    vec![Collection::with_nodes(MAIN_COLLECTION, parents.iter().copied())];
            } else if parents.contains(&node.id.as_str()) {
                node.specializations[0].nodes.push(NodeRef::new(child_id));
            }
        }
    }

    /// Helper to create a seeded store and a service over it
    async fn create_test_env(nodes: Vec<Node>) -> (MemoryNodeStore, RelationshipService) {
        let store = MemoryNodeStore::new();
        for node in nodes {
            store.insert(node).await;
        }
        let service = RelationshipService::new(Arc::new(store.clone()));
        (store, service)
    }

    async fn stored(store: &MemoryNodeStore, id: &str) -> Node {
        store.get(id).await.expect("node should exist")
    }

    // ============================================================================
    // addGeneralizations
    // ============================================================================

    #[tokio::test]
    async fn test_add_generalization_updates_both_endpoints() -> Result<()> {
        let mut nodes = vec![concept("thing"), concept("animal"), concept("dog")];
        link(&mut nodes, "dog", &["thing"]);
        let (store, service) = create_test_env(nodes).await;

        let dog = service
            .add_generalizations("dog", &refs(&["animal"]), USER, REASON, None)
            .await?;

        assert_eq!(dog.generalizations[0].ids(), vec!["thing", "animal"]);
        assert_eq!(
            dog.contributors_by_property.get("generalizations"),
            Some(&vec![USER.to_string()])
        );

        let animal = stored(&store, "animal").await;
        assert_eq!(animal.specializations[0].ids(), vec!["dog"]);

        let log = store.changelog_for("dog").await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].change_type, ChangeType::AddElement);
        assert_eq!(log[0].modified_property.as_deref(), Some("generalizations"));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_generalization_messages() -> Result<()> {
        let mut gone = concept("gone");
        gone.deleted = true;
        let (_store, service) = create_test_env(vec![concept("dog"), gone]).await;

        let err = service
            .add_generalizations("dog", &[], USER, REASON, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No generalization nodes provided");

        let err = service
            .add_generalizations("cat", &refs(&["dog"]), USER, REASON, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Child node cat not found");

        let err = service
            .add_generalizations("dog", &refs(&["ghost"]), USER, REASON, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Generalization node ghost not found");

        let err = service
            .add_generalizations("dog", &refs(&["gone"]), USER, REASON, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Generalization node gone is deleted"));

        Ok(())
    }

    // ============================================================================
    // Cycle Guard
    // ============================================================================

    #[tokio::test]
    async fn test_add_descendant_as_generalization_is_rejected() -> Result<()> {
        // animal -> mammal -> dog
        let mut nodes = vec![concept("animal"), concept("mammal"), concept("dog")];
        link(&mut nodes, "mammal", &["animal"]);
        link(&mut nodes, "dog", &["mammal"]);
        let (store, service) = create_test_env(nodes).await;

        let err = service
            .add_generalizations("animal", &refs(&["dog"]), USER, REASON, None)
            .await
            .unwrap_err();

        assert!(matches!(err, RelationshipError::CircularReference(_)));
        assert_eq!(
            err.to_string(),
            "Adding node dog as a generalization would create a circular reference"
        );

        assert!(stored(&store, "animal").await.generalizations[0].nodes.is_empty());
        assert!(stored(&store, "dog").await.specializations[0].nodes.is_empty());
        assert!(store.changelog().await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_add_self_as_generalization_is_rejected() -> Result<()> {
        let (_store, service) = create_test_env(vec![concept("loop")]).await;

        let err = service
            .add_generalizations("loop", &refs(&["loop"]), USER, REASON, None)
            .await
            .unwrap_err();

        assert!(matches!(err, RelationshipError::CircularReference(_)));

        Ok(())
    }

    #[tokio::test]
    async fn test_diamond_is_not_a_cycle() -> Result<()> {
        // top -> left, top -> right, left -> bottom; adding right -> bottom closes a diamond
        let mut nodes = vec![
            concept("top"),
            concept("left"),
            concept("right"),
            concept("bottom"),
        ];
        link(&mut nodes, "left", &["top"]);
        link(&mut nodes, "right", &["top"]);
        link(&mut nodes, "bottom", &["left"]);
        let (_store, service) = create_test_env(nodes).await;

        let bottom = service
            .add_generalizations("bottom", &refs(&["right"]), USER, REASON, None)
            .await?;
        assert_eq!(bottom.generalizations[0].ids(), vec!["left", "right"]);

        Ok(())
    }

    // ============================================================================
    // removeGeneralizations
    // ============================================================================

    #[tokio::test]
    async fn test_removing_last_generalization_is_rejected() -> Result<()> {
        let mut nodes = vec![concept("animal"), concept("dog")];
        link(&mut nodes, "dog", &["animal"]);
        let (store, service) = create_test_env(nodes).await;

        let err = service
            .remove_generalizations("dog", &refs(&["animal"]), USER, REASON)
            .await
            .unwrap_err();

        assert!(matches!(err, RelationshipError::Conflict(_)));
        assert!(err
            .to_string()
            .contains("Cannot remove all generalizations from a node"));
        assert_eq!(
            stored(&store, "dog").await.generalizations[0].ids(),
            vec!["animal"]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_removing_one_of_several_generalizations() -> Result<()> {
        let mut nodes = vec![concept("animal"), concept("pet"), concept("dog")];
        link(&mut nodes, "dog", &["animal", "pet"]);
        let (store, service) = create_test_env(nodes).await;

        let dog = service
            .remove_generalizations("dog", &refs(&["pet"]), USER, REASON)
            .await?;

        assert_eq!(dog.generalizations[0].ids(), vec!["animal"]);
        assert!(stored(&store, "pet").await.specializations[0].nodes.is_empty());
        assert_eq!(
            stored(&store, "animal").await.specializations[0].ids(),
            vec!["dog"]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_reorder_generalizations() -> Result<()> {
        let mut nodes = vec![concept("a"), concept("b"), concept("c"), concept("child")];
        link(&mut nodes, "child", &["a", "b", "c"]);
        let (_store, service) = create_test_env(nodes).await;

        let child = service
            .reorder_generalizations("child", &refs(&["c"]), &[0], MAIN_COLLECTION, USER, REASON)
            .await?;

        assert_eq!(child.generalizations[0].ids(), vec!["c", "a", "b"]);

        Ok(())
    }

    // ============================================================================
    // Inheritance on add
    // ============================================================================

    #[tokio::test]
    async fn test_inheritance_rules_applied_on_add() -> Result<()> {
        let mut animal = concept("animal");
        native(&mut animal, "alive", json!(true), InheritanceType::AlwaysInherit);
        native(&mut animal, "legs", json!(4), InheritanceType::InheritUnlessAlreadyOverRidden);
        native(&mut animal, "name", json!("Animal"), InheritanceType::NeverInherit);
        native(&mut animal, "habitat", json!("land"), InheritanceType::InheritUnlessAlreadyOverRidden);

        let mut bird = concept("bird");
        native(&mut bird, "alive", json!(false), InheritanceType::InheritUnlessAlreadyOverRidden);
        native(&mut bird, "legs", json!(2), InheritanceType::InheritUnlessAlreadyOverRidden);

        let mut nodes = vec![concept("thing"), animal, bird];
        link(&mut nodes, "bird", &["thing"]);
        let (store, service) = create_test_env(nodes).await;

        service
            .add_generalizations("bird", &refs(&["animal"]), USER, REASON, None)
            .await?;
        let bird = stored(&store, "bird").await;

        // alwaysInherit overwrites
        assert_eq!(bird.properties.get("alive"), Some(&json!(true)));
        assert_eq!(bird.inherited_from("alive"), Some("animal"));
        assert_eq!(
            bird.inheritance_type_of("alive"),
            Some(InheritanceType::InheritUnlessAlreadyOverRidden)
        );

        // An own value survives an overridable ancestor value
        assert_eq!(bird.properties.get("legs"), Some(&json!(2)));
        assert_eq!(bird.inherited_from("legs"), None);

        // Missing overridable values are filled in with their type
        assert_eq!(bird.properties.get("habitat"), Some(&json!("land")));
        assert_eq!(bird.inherited_from("habitat"), Some("animal"));
        assert_eq!(bird.property_type.get("habitat").map(String::as_str), Some("text"));

        // neverInherit never crosses the edge
        assert!(!bird.has_property("name"));

        Ok(())
    }

    #[tokio::test]
    async fn test_property_without_rule_is_overridable() -> Result<()> {
        let mut animal = concept("animal");
        animal.properties.insert("color".to_string(), json!("brown"));

        let mut nodes = vec![concept("thing"), animal, concept("dog")];
        link(&mut nodes, "dog", &["thing"]);
        let (store, service) = create_test_env(nodes).await;

        service
            .add_generalizations("dog", &refs(&["animal"]), USER, REASON, None)
            .await?;

        let dog = stored(&store, "dog").await;
        assert_eq!(dog.properties.get("color"), Some(&json!("brown")));
        assert_eq!(dog.inherited_from("color"), Some("animal"));
        assert!(!dog.property_type.contains_key("color"));

        Ok(())
    }

    #[tokio::test]
    async fn test_new_specialization_inherits_from_parent() -> Result<()> {
        let mut vehicle = concept("vehicle");
        native(&mut vehicle, "wheels", json!(4), InheritanceType::InheritUnlessAlreadyOverRidden);
        let (store, service) = create_test_env(vec![vehicle, concept("car")]).await;

        service
            .add_specializations("vehicle", &refs(&["car"]), USER, REASON, None)
            .await?;

        let car = stored(&store, "car").await;
        assert_eq!(car.properties.get("wheels"), Some(&json!(4)));
        assert_eq!(car.inherited_from("wheels"), Some("vehicle"));

        Ok(())
    }

    #[tokio::test]
    async fn test_changed_node_flags_its_specializations() -> Result<()> {
        let mut animal = concept("animal");
        native(&mut animal, "alive", json!(true), InheritanceType::AlwaysInherit);

        let mut nodes = vec![concept("thing"), animal, concept("dog"), concept("puppy")];
        link(&mut nodes, "dog", &["thing"]);
        link(&mut nodes, "puppy", &["dog"]);
        let (store, service) = create_test_env(nodes).await;

        service
            .add_generalizations("dog", &refs(&["animal"]), USER, REASON, None)
            .await?;

        let puppy = stored(&store, "puppy").await;
        assert!(puppy.pending_inheritance_update);
        // Deferred: the grandchild is flagged, not recomputed
        assert!(!puppy.has_property("alive"));

        Ok(())
    }

    // ============================================================================
    // Inheritance on remove
    // ============================================================================

    #[tokio::test]
    async fn test_removed_ancestor_property_is_resourced_or_dropped() -> Result<()> {
        let mut animal = concept("animal");
        native(&mut animal, "legs", json!(4), InheritanceType::InheritUnlessAlreadyOverRidden);
        native(&mut animal, "sound", json!("generic"), InheritanceType::InheritUnlessAlreadyOverRidden);

        let mut pet = concept("pet");
        native(&mut pet, "legs", json!(3), InheritanceType::InheritUnlessAlreadyOverRidden);

        let mut dog = concept("dog");
        dog.set_property("legs", json!(4), Some("text"), InheritanceRule::inherited_from("animal"));
        dog.set_property(
            "sound",
            json!("generic"),
            Some("text"),
            InheritanceRule::inherited_from("animal"),
        );
        native(&mut dog, "name", json!("Rex"), InheritanceType::InheritUnlessAlreadyOverRidden);

        let mut nodes = vec![animal, pet, dog];
        link(&mut nodes, "dog", &["animal", "pet"]);
        let (store, service) = create_test_env(nodes).await;

        service
            .remove_generalizations("dog", &refs(&["animal"]), USER, REASON)
            .await?;
        let dog = stored(&store, "dog").await;

        // Re-sourced from the remaining ancestor
        assert_eq!(dog.properties.get("legs"), Some(&json!(3)));
        assert_eq!(dog.inherited_from("legs"), Some("pet"));

        // No remaining source: dropped with type and rule
        assert!(!dog.has_property("sound"));
        assert!(!dog.property_type.contains_key("sound"));
        assert!(!dog.inheritance.contains_key("sound"));

        // Unrelated properties are untouched
        assert_eq!(dog.properties.get("name"), Some(&json!("Rex")));

        Ok(())
    }

    #[tokio::test]
    async fn test_resourcing_skips_never_inherit_ancestors() -> Result<()> {
        let mut first = concept("first");
        native(&mut first, "color", json!("red"), InheritanceType::InheritUnlessAlreadyOverRidden);
        let mut second = concept("second");
        native(&mut second, "color", json!("blue"), InheritanceType::NeverInherit);
        let mut third = concept("third");
        native(&mut third, "color", json!("green"), InheritanceType::InheritUnlessAlreadyOverRidden);

        let mut child = concept("child");
        child.set_property("color", json!("red"), Some("text"), InheritanceRule::inherited_from("first"));

        let mut nodes = vec![first, second, third, child];
        link(&mut nodes, "child", &["first", "second", "third"]);
        let (store, service) = create_test_env(nodes).await;

        service
            .remove_generalizations("child", &refs(&["first"]), USER, REASON)
            .await?;

        let child = stored(&store, "child").await;
        assert_eq!(child.properties.get("color"), Some(&json!("green")));
        assert_eq!(child.inherited_from("color"), Some("third"));

        Ok(())
    }

    #[tokio::test]
    async fn test_removing_specialization_drops_inherited_properties() -> Result<()> {
        let mut vehicle = concept("vehicle");
        native(&mut vehicle, "wheels", json!(4), InheritanceType::InheritUnlessAlreadyOverRidden);
        let mut car = concept("car");
        car.set_property("wheels", json!(4), None, InheritanceRule::inherited_from("vehicle"));

        let mut nodes = vec![concept("thing"), vehicle, car];
        link(&mut nodes, "car", &["vehicle", "thing"]);
        let (store, service) = create_test_env(nodes).await;

        service
            .remove_specializations("vehicle", &refs(&["car"]), USER, REASON)
            .await?;

        let car = stored(&store, "car").await;
        assert_eq!(car.generalizations[0].ids(), vec!["thing"]);
        assert!(!car.has_property("wheels"));

        Ok(())
    }
}
