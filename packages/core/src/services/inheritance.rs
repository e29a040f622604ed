//! Inheritance Propagator
//!
//! Recomputes which properties a node inherits, and from which ancestor, when
//! its generalization set changes. Both entry points work on node snapshots
//! already loaded in the caller's working set; their effects are committed with
//! the edge change that triggered them.
//!
//! Provenance is tracked per property in `Node::inheritance`: a rule whose
//! `ref` names an ancestor marks the value as inherited from that ancestor.

use crate::models::{InheritanceRule, InheritanceType, Node};

/// How `ancestor` wants `property` handed down
///
/// A property without an inheritance entry is overridable.
fn rule_for(ancestor: &Node, property: &str) -> InheritanceType {
    ancestor
        .inheritance_type_of(property)
        .unwrap_or(InheritanceType::InheritUnlessAlreadyOverRidden)
}

/// Copy `property` from `ancestor` onto `child`, recording provenance
fn copy_from(child: &mut Node, ancestor: &Node, property: &str, rule: InheritanceRule) {
    let Some(value) = ancestor.properties.get(property) else {
        return;
    };
    child
        .properties
        .insert(property.to_string(), value.clone());
    match ancestor.property_type.get(property) {
        Some(property_type) => {
            child
                .property_type
                .insert(property.to_string(), property_type.clone());
        }
        None => {
            child.property_type.remove(property);
        }
    }
    child.inheritance.insert(property.to_string(), rule);
}

/// Apply the properties of a newly added generalization to `child`
///
/// - `alwaysInherit` values overwrite whatever the child holds
/// - `inheritUnlessAlreadyOverRidden` values are copied only if the child lacks the property
/// - `neverInherit` values are never copied
///
/// Every copied property is recorded as `inheritUnlessAlreadyOverRidden` with
/// `ref` pointing at `ancestor`. Returns true if `child` changed.
pub fn apply_added_generalization(child: &mut Node, ancestor: &Node) -> bool {
    if ancestor.deleted || child.deleted {
        return false;
    }

    let before = child.clone();
    for property in ancestor.properties.keys() {
        let copy = match rule_for(ancestor, property) {
            InheritanceType::NeverInherit => false,
            InheritanceType::AlwaysInherit => true,
            InheritanceType::InheritUnlessAlreadyOverRidden => !child.has_property(property),
        };
        if copy {
            copy_from(
                child,
                ancestor,
                property,
                InheritanceRule::inherited_from(ancestor.id.as_str()),
            );
        }
    }

    *child != before
}

/// Re-source or drop the properties `child` inherited from `removed_id`
///
/// `remaining` are the child's generalizations after the removal, in
/// collection order then node order. The first one that still owns a property
/// (and is neither deleted nor marks it `neverInherit`) becomes its new source;
/// the child keeps its own inheritance type. Properties with no remaining
/// source are removed with their type and inheritance entries.
///
/// Returns true if `child` changed.
pub fn apply_removed_generalization(child: &mut Node, removed_id: &str, remaining: &[&Node]) -> bool {
    let affected: Vec<String> = child
        .inheritance
        .iter()
        .filter(|(_, rule)| rule.source_id() == Some(removed_id))
        .map(|(property, _)| property.clone())
        .collect();

    for property in &affected {
        let source = remaining.iter().find(|ancestor| {
            ancestor.id != removed_id
                && !ancestor.deleted
                && ancestor.has_property(property)
                && rule_for(ancestor, property) != InheritanceType::NeverInherit
        });

        match source {
            Some(ancestor) => {
                let inheritance_type = child
                    .inheritance_type_of(property)
                    .unwrap_or(InheritanceType::InheritUnlessAlreadyOverRidden);
                let rule = InheritanceRule {
                    inheritance_type,
                    source: Some(ancestor.id.clone()),
                };
                tracing::debug!(
                    node_id = %child.id,
                    property = %property,
                    new_source = %ancestor.id,
                    "Re-sourcing inherited property"
                );
                copy_from(child, ancestor, property, rule);
            }
            None => {
                tracing::debug!(
                    node_id = %child.id,
                    property = %property,
                    "Dropping property with no remaining source"
                );
                child.remove_property(property);
            }
        }
    }

    !affected.is_empty()
}
